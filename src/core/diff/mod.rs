//! Edit-script engine.
//!
//! [`diff`] aligns two texts on their longest common subsequence (Myers'
//! algorithm, via `similar`) and turns the alignment into an
//! [`EditScript`]. [`apply`] replays a script against a source text and
//! refuses scripts that do not line up with it.
//!
//! Both functions are pure. The round-trip law holds for every pair of
//! texts:
//!
//! ```
//! use delta_cache::diff::{apply, diff};
//!
//! let script = diff("body 1", "body 2");
//! assert_eq!(apply("body 1", &script).unwrap(), "body 2");
//! assert!(diff("same", "same").is_empty());
//! ```
//!
//! # Normal Form
//!
//! Scripts come out normalised so that equal runs stay maximal:
//!
//! - adjacent operations of the same kind are merged,
//! - inside each changed region all deletions precede all insertions,
//! - identical texts produce zero operations.

use crate::core::error::{DeltaError, Result};
use crate::core::types::{EditOp, EditScript};
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

/// Token size used to align the two texts.
///
/// Operation lengths are always counted in characters; granularity only
/// changes which alignments the diff considers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Character-level alignment. Smallest scripts, quadratic worst case.
    #[default]
    Chars,
    /// Line-level alignment. Faster on large documents, coarser scripts.
    Lines,
}

/// Compute a character-level edit script from `source` to `target`.
#[must_use]
pub fn diff(source: &str, target: &str) -> EditScript {
    diff_with(source, target, Granularity::Chars)
}

/// Compute an edit script using the given alignment granularity.
#[must_use]
pub fn diff_with(source: &str, target: &str, granularity: Granularity) -> EditScript {
    let source_len = source.chars().count();
    if source == target {
        return EditScript::identity(source_len);
    }

    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    let text_diff = match granularity {
        Granularity::Chars => config.diff_chars(source, target),
        Granularity::Lines => config.diff_lines(source, target),
    };

    let mut script = EditScript::identity(source_len);
    let mut pending_delete = 0usize;
    let mut pending_insert = String::new();

    for change in text_diff.iter_all_changes() {
        let value = change.value();
        match change.tag() {
            ChangeTag::Equal => {
                flush_region(&mut script, &mut pending_delete, &mut pending_insert);
                script.push(EditOp::Equal {
                    len: value.chars().count(),
                });
            }
            ChangeTag::Delete => pending_delete += value.chars().count(),
            ChangeTag::Insert => pending_insert.push_str(value),
        }
    }
    flush_region(&mut script, &mut pending_delete, &mut pending_insert);

    script.finish()
}

/// Emit a changed region as delete-then-insert.
fn flush_region(script: &mut EditScript, pending_delete: &mut usize, pending_insert: &mut String) {
    if *pending_delete > 0 {
        script.push(EditOp::Delete {
            len: std::mem::take(pending_delete),
        });
    }
    if !pending_insert.is_empty() {
        script.push(EditOp::Insert {
            text: std::mem::take(pending_insert),
        });
    }
}

/// Apply `script` to `source`, reconstructing the target text.
///
/// # Errors
///
/// Returns [`DeltaError::PatchMismatch`] when the script's source length
/// differs from `source`, when an operation runs past the end of `source`,
/// or when the script leaves part of `source` unconsumed.
pub fn apply(source: &str, script: &EditScript) -> Result<String> {
    let actual_len = source.chars().count();
    if actual_len != script.source_len {
        return Err(DeltaError::PatchMismatch(format!(
            "source has {} chars, script expects {}",
            actual_len, script.source_len
        )));
    }
    if script.is_empty() {
        return Ok(source.to_string());
    }

    let mut out = String::with_capacity(source.len());
    let mut pos = 0usize;

    for (index, op) in script.ops.iter().enumerate() {
        match op {
            EditOp::Equal { len } | EditOp::Delete { len } => {
                let span = advance(&source[pos..], *len).ok_or_else(|| {
                    DeltaError::PatchMismatch(format!(
                        "operation {} needs {} chars past the end of the source",
                        index, len
                    ))
                })?;
                if matches!(op, EditOp::Equal { .. }) {
                    out.push_str(&source[pos..pos + span]);
                }
                pos += span;
            }
            EditOp::Insert { text } => out.push_str(text),
        }
    }

    if pos != source.len() {
        return Err(DeltaError::PatchMismatch(format!(
            "script leaves {} trailing bytes of the source unconsumed",
            source.len() - pos
        )));
    }

    Ok(out)
}

/// Byte length of the first `n` chars of `rest`, if it has that many.
fn advance(rest: &str, n: usize) -> Option<usize> {
    if n == 0 {
        return Some(0);
    }
    rest.char_indices()
        .nth(n - 1)
        .map(|(offset, c)| offset + c.len_utf8())
}
