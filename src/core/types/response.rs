//! HTTP response as seen by a delta-aware client.
//!
//! The [`DeltaResponse`] type is transport-agnostic: the reqwest client
//! builds one from the wire, and tests can build one by hand and feed it to
//! a [`Reconciler`](crate::client::Reconciler).
//!
//! # Status Codes
//!
//! | Code | Name | Body |
//! |------|------|------|
//! | 200 | OK | Full representation |
//! | 226 | IM Used | JSON edit script relative to `Delta-Base` |
//! | 304 | Not Modified | Empty |
//!
//! # Examples
//!
//! ```
//! use delta_cache::{DeltaResponse, VersionId};
//!
//! let response = DeltaResponse::new(226, "{}")
//!     .with_header("ETag", "\"v2\"")
//!     .with_header("Delta-Base", "\"v1\"")
//!     .with_header("IM", "googlediffjson");
//!
//! assert!(response.is_delta());
//! assert_eq!(response.etag(), Some(VersionId::new("v2")));
//! assert_eq!(response.delta_base(), Some(VersionId::new("v1")));
//! ```

use crate::core::protocol::{self, constants::headers, constants::status};
use crate::core::types::VersionId;
use bytes::Bytes;
use std::collections::BTreeMap;

/// HTTP response carrying delta-encoding metadata.
#[derive(Clone, Debug)]
pub struct DeltaResponse {
    pub status: u16,

    /// Response headers. Lookups through [`DeltaResponse::header`] are
    /// case-insensitive.
    pub headers: BTreeMap<String, String>,

    pub body: Bytes,
}

impl DeltaResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        DeltaResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Build from an `http` header map, keeping only UTF-8 header values.
    pub fn from_parts(status: u16, header_map: &http::HeaderMap, body: impl Into<Bytes>) -> Self {
        let headers = header_map
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        DeltaResponse {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The version this response represents.
    pub fn etag(&self) -> Option<VersionId> {
        self.header(headers::ETAG)
            .and_then(VersionId::from_etag)
    }

    /// The version a `226` script is relative to.
    pub fn delta_base(&self) -> Option<VersionId> {
        self.header(headers::DELTA_BASE)
            .and_then(VersionId::from_etag)
    }

    /// Instance manipulations applied to the body, in order.
    pub fn instance_manipulations(&self) -> Vec<String> {
        self.header(headers::IM)
            .map(protocol::parse_im_list)
            .unwrap_or_default()
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    #[inline]
    pub fn is_delta(&self) -> bool {
        self.status == status::IM_USED
    }

    #[inline]
    pub fn is_not_modified(&self) -> bool {
        self.status == status::NOT_MODIFIED
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Default for DeltaResponse {
    fn default() -> Self {
        DeltaResponse::new(status::OK, Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let response = DeltaResponse::new(200, "data");
        assert_eq!(response.status, 200);
        assert!(!response.is_delta());
        assert!(response.is_success());
    }

    #[test]
    fn test_header_case_insensitive() {
        let response = DeltaResponse::new(200, "data").with_header("ETag", "\"v1\"");
        assert_eq!(response.header("etag"), Some("\"v1\""));
        assert_eq!(response.etag(), Some(VersionId::new("v1")));
    }

    #[test]
    fn test_not_modified() {
        let response = DeltaResponse::new(304, "");
        assert!(response.is_not_modified());
        assert!(!response.is_success());
    }

    #[test]
    fn test_instance_manipulations() {
        let response = DeltaResponse::new(226, "").with_header("IM", "googlediffjson, gzip");
        assert_eq!(
            response.instance_manipulations(),
            vec!["googlediffjson".to_string(), "gzip".to_string()]
        );
    }

    #[test]
    fn test_from_parts() {
        let mut map = http::HeaderMap::new();
        map.insert("etag", http::HeaderValue::from_static("\"abc\""));
        map.insert("delta-base", http::HeaderValue::from_static("\"xyz\""));
        let response = DeltaResponse::from_parts(226, &map, "{}");
        assert_eq!(response.etag(), Some(VersionId::new("abc")));
        assert_eq!(response.delta_base(), Some(VersionId::new("xyz")));
        assert_eq!(response.body_str(), Some("{}"));
    }

    #[test]
    fn test_default() {
        let response = DeltaResponse::default();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert!(response.etag().is_none());
    }
}
