//! Edit scripts: ordered operations that turn one text into another.
//!
//! An [`EditScript`] is read left to right against its source text. Each
//! operation either copies, skips or emits characters:
//!
//! | Op | Effect on source cursor | Output |
//! |----|-------------------------|--------|
//! | `Equal { len }` | advances `len` chars | the copied chars |
//! | `Delete { len }` | advances `len` chars | nothing |
//! | `Insert { text }` | unchanged | `text` |
//!
//! Lengths count Unicode scalar values, not bytes, so a script stays valid
//! for any UTF-8 encoding of the same text.
//!
//! # Wire Format
//!
//! Scripts travel as the body of a `226 IM Used` response:
//!
//! ```text
//! {"source_len":6,"ops":[{"op":"equal","len":5},{"op":"delete","len":1},{"op":"insert","text":"2"}]}
//! ```
//!
//! # Examples
//!
//! ```
//! use delta_cache::{EditOp, EditScript};
//!
//! let script = EditScript::new(6, vec![
//!     EditOp::Equal { len: 5 },
//!     EditOp::Delete { len: 1 },
//!     EditOp::Insert { text: "2".into() },
//! ]);
//! let json = script.to_json().unwrap();
//! assert_eq!(EditScript::from_json(&json).unwrap(), script);
//! ```

use crate::core::error::Result;
use serde::{Deserialize, Serialize};

/// A single edit operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp {
    /// Copy `len` characters from the source.
    Equal { len: usize },
    /// Emit `text`.
    Insert { text: String },
    /// Skip `len` characters of the source.
    Delete { len: usize },
}

impl EditOp {
    /// Number of source characters this operation consumes.
    #[inline]
    #[must_use]
    pub fn source_len(&self) -> usize {
        match self {
            EditOp::Equal { len } | EditOp::Delete { len } => *len,
            EditOp::Insert { .. } => 0,
        }
    }

    /// Number of target characters this operation produces.
    #[inline]
    #[must_use]
    pub fn target_len(&self) -> usize {
        match self {
            EditOp::Equal { len } => *len,
            EditOp::Insert { text } => text.chars().count(),
            EditOp::Delete { .. } => 0,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            EditOp::Equal { len } | EditOp::Delete { len } => *len == 0,
            EditOp::Insert { text } => text.is_empty(),
        }
    }
}

/// Summary statistics for a script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScriptStats {
    pub chars_inserted: usize,
    pub chars_deleted: usize,
    pub chars_unchanged: usize,
}

/// An ordered edit script bound to the length of its source text.
///
/// A script that only copies its source is reduced to zero operations, so
/// [`EditScript::is_empty`] is exactly "source and target are identical".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditScript {
    /// Character count of the text this script was computed from.
    pub source_len: usize,
    pub ops: Vec<EditOp>,
}

impl EditScript {
    /// Build a script from raw operations, normalising them.
    ///
    /// Empty operations are dropped, adjacent operations of the same kind
    /// are merged, and a script that is a single full-length copy becomes
    /// empty.
    #[must_use]
    pub fn new(source_len: usize, ops: Vec<EditOp>) -> Self {
        let mut script = EditScript {
            source_len,
            ops: Vec::with_capacity(ops.len()),
        };
        for op in ops {
            script.push(op);
        }
        script.finish()
    }

    /// Zero-operation script over a source of `source_len` chars.
    #[inline]
    #[must_use]
    pub fn identity(source_len: usize) -> Self {
        EditScript {
            source_len,
            ops: Vec::new(),
        }
    }

    /// Append an operation, merging it into the previous one when they are
    /// of the same kind.
    pub(crate) fn push(&mut self, op: EditOp) {
        if op.is_empty() {
            return;
        }
        match (self.ops.last_mut(), op) {
            (Some(EditOp::Equal { len }), EditOp::Equal { len: more })
            | (Some(EditOp::Delete { len }), EditOp::Delete { len: more }) => *len += more,
            (Some(EditOp::Insert { text }), EditOp::Insert { text: more }) => {
                text.push_str(&more)
            }
            (_, op) => self.ops.push(op),
        }
    }

    /// Drop a lone full copy so identical texts yield no operations.
    pub(crate) fn finish(mut self) -> Self {
        if self
            .ops
            .iter()
            .all(|op| matches!(op, EditOp::Equal { .. }))
        {
            self.ops.clear();
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Character count of the text this script produces.
    #[must_use]
    pub fn target_len(&self) -> usize {
        if self.ops.is_empty() {
            return self.source_len;
        }
        self.ops.iter().map(EditOp::target_len).sum()
    }

    #[must_use]
    pub fn stats(&self) -> ScriptStats {
        if self.ops.is_empty() {
            return ScriptStats {
                chars_unchanged: self.source_len,
                ..ScriptStats::default()
            };
        }
        self.ops
            .iter()
            .fold(ScriptStats::default(), |mut stats, op| {
                match op {
                    EditOp::Equal { len } => stats.chars_unchanged += len,
                    EditOp::Delete { len } => stats.chars_deleted += len,
                    EditOp::Insert { text } => stats.chars_inserted += text.chars().count(),
                }
                stats
            })
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON wire format.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Parse the JSON wire format from raw response bytes.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}
