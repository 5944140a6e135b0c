//! Error types for delta-cache operations.
//!
//! The [`Result`] type alias provides a shorthand for operations that may fail.
//!
//! # Error Categories
//!
//! | Category | Variants | Recoverable by full re-fetch |
//! |----------|----------|------------------------------|
//! | History | `EmptyHistory`, `UnknownVersion` | `UnknownVersion` only |
//! | Patching | `PatchMismatch`, `Reconciliation` | Yes |
//! | Transport | `BodyBuffer`, `Http` | No |
//! | Encoding | `Json` | No |
//! | Configuration | `Config` | No |
//!
//! Negotiation never surfaces `UnknownVersion` to a client: the middleware
//! resolves it locally into a full `200` response.
//!
//! # Examples
//!
//! ```
//! use delta_cache::DeltaError;
//!
//! let err = DeltaError::PatchMismatch("source has 3 chars, script expects 5".into());
//! assert!(err.is_recoverable());
//! assert!(err.to_string().contains("expects 5"));
//! ```

use thiserror::Error;

/// Result type for delta-cache operations.
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Errors that can occur while recording versions, computing or applying
/// edit scripts, and reconciling delta responses.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeltaError {
    /// A history was queried before any version was added to it.
    ///
    /// The middleware always adds a version before querying, so this marks
    /// a broken internal invariant.
    #[error("No versions recorded for resource {0}")]
    EmptyHistory(String),

    /// The requested version id is not retained for this resource.
    ///
    /// Either it never existed or it was evicted by the history bound.
    #[error("Unknown version {id} for resource {key}")]
    UnknownVersion { key: String, id: String },

    /// An edit script does not line up with the text it is applied to.
    #[error("Patch mismatch: {0}")]
    PatchMismatch(String),

    /// A client could not rebuild the current representation from a delta.
    ///
    /// Recovery: drop the cached version and request again without a
    /// validator, which forces a full response.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// The handler's response body could not be buffered.
    #[error("Failed to buffer response body: {0}")]
    BodyBuffer(String),

    /// Unexpected HTTP status or transport failure seen by the client.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Edit script (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for DeltaError {
    fn from(err: reqwest::Error) -> Self {
        DeltaError::Http(err.to_string())
    }
}

impl DeltaError {
    /// Check whether re-requesting the resource without a validator fixes
    /// this error.
    ///
    /// ```
    /// use delta_cache::DeltaError;
    ///
    /// assert!(DeltaError::Reconciliation("diverged".into()).is_recoverable());
    /// assert!(!DeltaError::BodyBuffer("too large".into()).is_recoverable());
    /// ```
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DeltaError::UnknownVersion { .. }
                | DeltaError::PatchMismatch(_)
                | DeltaError::Reconciliation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_version_is_recoverable() {
        let err = DeltaError::UnknownVersion {
            key: "/doc".into(),
            id: "abc".into(),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("/doc"));
    }

    #[test]
    fn test_empty_history_not_recoverable() {
        let err = DeltaError::EmptyHistory("/doc".into());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/doc"));
    }

    #[test]
    fn test_body_buffer_not_recoverable() {
        assert!(!DeltaError::BodyBuffer("length limit exceeded".into()).is_recoverable());
    }

    #[test]
    fn test_config_error_display() {
        let err = DeltaError::Config("max_versions must be at least 1".into());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_json_error_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DeltaError = parse.into();
        assert!(matches!(err, DeltaError::Json(_)));
        assert!(!err.is_recoverable());
    }
}
