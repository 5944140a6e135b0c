//! Version identifiers and immutable content snapshots.
//!
//! A [`VersionId`] names one snapshot of a resource and doubles as the HTTP
//! entity tag. It is derived deterministically from the content (a SHA-256
//! digest by default) or from a per-resource sequence counter.
//!
//! In HTTP headers, ids travel as quoted strings:
//!
//! ```text
//! ETag: "3f0a9c..."
//! If-None-Match: "3f0a9c...", "77be10..."
//! Delta-Base: "3f0a9c..."
//! ```
//!
//! # Examples
//!
//! ```
//! use delta_cache::VersionId;
//!
//! let id = VersionId::new("abc123");
//! assert_eq!(id.to_etag(), "\"abc123\"");
//! assert_eq!(VersionId::from_etag("W/\"abc123\""), Some(id));
//! ```

use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Identifier of a stored version, used as the entity tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Create an id from any string-like value.
    #[inline]
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        VersionId(s.into())
    }

    /// Content-derived id: lowercase hex SHA-256 of the text.
    ///
    /// ```
    /// use delta_cache::VersionId;
    ///
    /// let a = VersionId::for_content("body 1");
    /// assert_eq!(a, VersionId::for_content("body 1"));
    /// assert_ne!(a, VersionId::for_content("body 2"));
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    #[must_use]
    pub fn for_content(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        VersionId(format!("{:x}", digest))
    }

    /// Sequence-derived id, scoped to a single resource.
    #[inline]
    #[must_use]
    pub fn sequence(n: u64) -> Self {
        VersionId(n.to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format as a strong entity tag (`"id"`).
    #[must_use]
    pub fn to_etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Parse a single entity tag.
    ///
    /// Accepts strong (`"id"`) and weak (`W/"id"`) tags and, leniently, bare
    /// tokens. Returns `None` for the wildcard `*` and for empty input.
    ///
    /// ```
    /// use delta_cache::VersionId;
    ///
    /// assert_eq!(VersionId::from_etag(" \"v1\" "), Some(VersionId::new("v1")));
    /// assert_eq!(VersionId::from_etag("v1"), Some(VersionId::new("v1")));
    /// assert_eq!(VersionId::from_etag("*"), None);
    /// assert_eq!(VersionId::from_etag("\"\""), None);
    /// ```
    #[must_use]
    pub fn from_etag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        if tag == "*" {
            return None;
        }
        let inner = tag
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(tag);
        if inner.is_empty() {
            None
        } else {
            Some(VersionId(inner.to_string()))
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        VersionId::new(s)
    }
}

impl From<String> for VersionId {
    fn from(s: String) -> Self {
        VersionId(s)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An immutable snapshot of a resource's textual content.
///
/// Cloning is cheap: the content is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Version {
    pub id: VersionId,
    pub content: Arc<str>,
    /// When this snapshot was recorded (or last re-recorded).
    pub created_at: Instant,
}

impl Version {
    #[must_use]
    pub fn new(id: VersionId, content: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            content: content.into(),
            created_at: Instant::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.content == other.content
    }
}

impl Eq for Version {}
