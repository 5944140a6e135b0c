//! Per-request negotiation decisions.

use crate::core::types::{EditScript, VersionId};

/// The response shape chosen for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `200`: send the full representation.
    Full,
    /// `304`: the client's version is current.
    NotModified,
    /// `226`: send `script`, which turns the client's `base` into the latest
    /// representation.
    Delta { base: VersionId, script: EditScript },
}

impl Outcome {
    #[must_use]
    pub fn status(&self) -> u16 {
        use crate::core::protocol::constants::status;
        match self {
            Outcome::Full => status::OK,
            Outcome::NotModified => status::NOT_MODIFIED,
            Outcome::Delta { .. } => status::IM_USED,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Full => "full",
            Outcome::NotModified => "not-modified",
            Outcome::Delta { .. } => "delta",
        }
    }
}

/// Result of recording a body and resolving the client's validators.
#[derive(Clone, Debug)]
pub struct Negotiation {
    /// Id of the version just recorded (the new `ETag`).
    pub id: VersionId,
    pub outcome: Outcome,
}
