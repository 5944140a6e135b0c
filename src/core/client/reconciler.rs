//! Client-side reconciliation of delta-encoded responses.
//!
//! A [`Reconciler`] tracks the last representation a client holds for one
//! resource and folds each response into it:
//!
//! | Status | Effect on the cache |
//! |--------|---------------------|
//! | 200 | replaced with the body and its `ETag` |
//! | 304 | kept, adopting the `ETag` if it names a new id |
//! | 226 | edit script applied to the cached body |
//!
//! Any reconciliation failure drops the cache, so the next request carries
//! no validator and the server answers in full.

use crate::core::diff;
use crate::core::error::{DeltaError, Result};
use crate::core::protocol::{self, constants};
use crate::core::types::{DeltaResponse, EditScript, VersionId};
use http::header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH};

/// The representation a client currently holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedVersion {
    /// Id from the response's `ETag`. `None` when the server sent no tag,
    /// in which case the content cannot serve as a delta base.
    pub id: Option<VersionId>,
    pub content: String,
}

/// Reconciles responses for a single resource.
///
/// # Examples
///
/// ```
/// use delta_cache::client::Reconciler;
/// use delta_cache::diff::diff;
/// use delta_cache::{DeltaResponse, VersionId};
///
/// let mut reconciler = Reconciler::default();
/// let full = DeltaResponse::new(200, "body 1")
///     .with_header("etag", VersionId::new("v1").to_etag());
/// assert_eq!(reconciler.reconcile(&full).unwrap(), "body 1");
///
/// let script = diff("body 1", "body 2");
/// let delta = DeltaResponse::new(226, script.to_json().unwrap())
///     .with_header("etag", "\"v2\"")
///     .with_header("im", "googlediffjson")
///     .with_header("delta-base", "\"v1\"");
/// assert_eq!(reconciler.reconcile(&delta).unwrap(), "body 2");
/// ```
#[derive(Clone, Debug)]
pub struct Reconciler {
    delta_token: String,
    cache: Option<CachedVersion>,
}

impl Reconciler {
    /// Create a reconciler that advertises `delta_token` in `A-IM`.
    #[must_use]
    pub fn new(delta_token: impl Into<String>) -> Self {
        Self {
            delta_token: delta_token.into(),
            cache: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn cached(&self) -> Option<&CachedVersion> {
        self.cache.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn cached_id(&self) -> Option<&VersionId> {
        self.cache.as_ref().and_then(|c| c.id.as_ref())
    }

    /// Drop the cached representation.
    pub fn reset(&mut self) {
        self.cache = None;
    }

    /// Request headers for the next fetch: `If-None-Match` naming the cached
    /// version (when there is one with an id) and `A-IM` with the delta token.
    #[must_use]
    pub fn validator_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(id) = self.cached_id() {
            let value = protocol::format_if_none_match(std::slice::from_ref(id));
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }
        if let Ok(token) = HeaderValue::from_str(&self.delta_token) {
            headers.insert(HeaderName::from_static(constants::headers::A_IM), token);
        }
        headers
    }

    /// Fold a response into the cache and return the current content.
    ///
    /// # Errors
    ///
    /// - [`DeltaError::Reconciliation`] when a `304` or `226` cannot be
    ///   resolved against the cache. The cache is dropped first.
    /// - [`DeltaError::Http`] for any other status or a non-UTF-8 body.
    pub fn reconcile(&mut self, response: &DeltaResponse) -> Result<&str> {
        match response.status {
            constants::status::OK => {
                let content = response
                    .body_str()
                    .ok_or_else(|| DeltaError::Http("response body is not UTF-8".to_string()))?
                    .to_string();
                self.cache = Some(CachedVersion {
                    id: response.etag(),
                    content,
                });
            }
            constants::status::NOT_MODIFIED => self.check_not_modified(response)?,
            constants::status::IM_USED => {
                match self.apply_delta(response) {
                    Ok(cache) => self.cache = Some(cache),
                    Err(err) => {
                        self.reset();
                        return Err(err);
                    }
                }
            }
            other => {
                return Err(DeltaError::Http(format!("unexpected status {}", other)));
            }
        }
        self.cache
            .as_ref()
            .map(|c| c.content.as_str())
            .ok_or_else(|| DeltaError::Reconciliation("no cached content".to_string()))
    }

    fn check_not_modified(&mut self, response: &DeltaResponse) -> Result<()> {
        let Some(cached_id) = self.cached_id() else {
            return Err(DeltaError::Reconciliation(
                "304 received without a cached version".to_string(),
            ));
        };
        // Unchanged content may be issued a new id (sequence ids count every
        // change, including a revert), so adopt the tag the server names.
        if let Some(tag) = response.etag() {
            if &tag != cached_id {
                tracing::debug!(old = %cached_id, new = %tag, "304 renamed cached version");
                if let Some(cache) = self.cache.as_mut() {
                    cache.id = Some(tag);
                }
            }
        }
        Ok(())
    }

    fn apply_delta(&self, response: &DeltaResponse) -> Result<CachedVersion> {
        let reconcile_err = |msg: String| DeltaError::Reconciliation(msg);

        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| reconcile_err("226 received without a cached version".to_string()))?;
        let cached_id = cache
            .id
            .as_ref()
            .ok_or_else(|| reconcile_err("cached version has no id".to_string()))?;

        let manipulations = response.instance_manipulations();
        if !manipulations
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&self.delta_token))
        {
            return Err(reconcile_err(format!(
                "226 uses {:?}, expected {}",
                manipulations, self.delta_token
            )));
        }

        match response.delta_base() {
            Some(base) if &base == cached_id => {}
            Some(base) => {
                return Err(reconcile_err(format!(
                    "delta base {} does not match cached {}",
                    base, cached_id
                )))
            }
            None => return Err(reconcile_err("226 without Delta-Base".to_string())),
        }

        let new_id = response
            .etag()
            .ok_or_else(|| reconcile_err("226 without ETag".to_string()))?;
        let script = EditScript::from_slice(&response.body)
            .map_err(|e| reconcile_err(format!("undecodable edit script: {}", e)))?;
        let content = diff::apply(&cache.content, &script)
            .map_err(|e| reconcile_err(e.to_string()))?;

        Ok(CachedVersion {
            id: Some(new_id),
            content,
        })
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(constants::DEFAULT_DELTA_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diff::diff;

    fn full(body: &str) -> DeltaResponse {
        DeltaResponse::new(200, body.to_string())
            .with_header("etag", VersionId::for_content(body).to_etag())
    }

    fn delta(from: &str, to: &str) -> DeltaResponse {
        DeltaResponse::new(226, diff(from, to).to_json().unwrap())
            .with_header("etag", VersionId::for_content(to).to_etag())
            .with_header("im", "googlediffjson")
            .with_header("delta-base", VersionId::for_content(from).to_etag())
    }

    fn not_modified(body: &str) -> DeltaResponse {
        DeltaResponse::new(304, "").with_header("etag", VersionId::for_content(body).to_etag())
    }

    #[test]
    fn test_validator_headers_empty_cache() {
        let reconciler = Reconciler::default();
        let headers = reconciler.validator_headers();
        assert!(headers.get("if-none-match").is_none());
        assert_eq!(headers.get("a-im").unwrap(), "googlediffjson");
    }

    #[test]
    fn test_validator_headers_after_full() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("hello")).unwrap();
        let headers = reconciler.validator_headers();
        assert_eq!(
            headers.get("if-none-match").unwrap().to_str().unwrap(),
            VersionId::for_content("hello").to_etag()
        );
    }

    #[test]
    fn test_full_without_etag_sends_no_validator() {
        let mut reconciler = Reconciler::default();
        assert_eq!(
            reconciler.reconcile(&DeltaResponse::new(200, "plain")).unwrap(),
            "plain"
        );
        assert!(reconciler.cached_id().is_none());
        assert!(reconciler.validator_headers().get("if-none-match").is_none());
    }

    #[test]
    fn test_not_modified_keeps_cache() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        assert_eq!(reconciler.reconcile(&not_modified("body 1")).unwrap(), "body 1");
    }

    #[test]
    fn test_not_modified_with_new_id_keeps_content() {
        let mut reconciler = Reconciler::default();
        reconciler
            .reconcile(&DeltaResponse::new(200, "a").with_header("etag", "\"1\""))
            .unwrap();
        let renamed = DeltaResponse::new(304, "").with_header("etag", "\"3\"");
        assert_eq!(reconciler.reconcile(&renamed).unwrap(), "a");
        assert_eq!(reconciler.cached_id(), Some(&VersionId::new("3")));
        assert_eq!(
            reconciler.validator_headers().get("if-none-match").unwrap(),
            "\"3\""
        );
    }

    #[test]
    fn test_not_modified_without_cache() {
        let mut reconciler = Reconciler::default();
        let err = reconciler.reconcile(&not_modified("body 1")).unwrap_err();
        assert!(matches!(err, DeltaError::Reconciliation(_)));
    }

    #[test]
    fn test_delta_applies() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        assert_eq!(reconciler.reconcile(&delta("body 1", "body 2")).unwrap(), "body 2");
        assert_eq!(
            reconciler.cached_id(),
            Some(&VersionId::for_content("body 2"))
        );
    }

    #[test]
    fn test_delta_chain() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("a")).unwrap();
        reconciler.reconcile(&delta("a", "ab")).unwrap();
        reconciler.reconcile(&delta("ab", "abc")).unwrap();
        assert_eq!(reconciler.cached().unwrap().content, "abc");
    }

    #[test]
    fn test_delta_wrong_base_drops_cache() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        let err = reconciler.reconcile(&delta("other", "body 2")).unwrap_err();
        assert!(matches!(err, DeltaError::Reconciliation(_)));
        assert!(err.is_recoverable());
        assert!(reconciler.cached().is_none());
    }

    #[test]
    fn test_delta_without_cache() {
        let mut reconciler = Reconciler::default();
        let err = reconciler.reconcile(&delta("a", "b")).unwrap_err();
        assert!(matches!(err, DeltaError::Reconciliation(_)));
    }

    #[test]
    fn test_delta_garbage_body_drops_cache() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        let bad = DeltaResponse::new(226, "{not json")
            .with_header("etag", "\"v2\"")
            .with_header("im", "googlediffjson")
            .with_header("delta-base", VersionId::for_content("body 1").to_etag());
        assert!(reconciler.reconcile(&bad).is_err());
        assert!(reconciler.cached().is_none());
    }

    #[test]
    fn test_delta_length_mismatch_drops_cache() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        // Script computed against a longer text that happens to share the id.
        let bad = DeltaResponse::new(226, diff("body 1 and more", "x").to_json().unwrap())
            .with_header("etag", "\"v2\"")
            .with_header("im", "googlediffjson")
            .with_header("delta-base", VersionId::for_content("body 1").to_etag());
        assert!(matches!(
            reconciler.reconcile(&bad),
            Err(DeltaError::Reconciliation(_))
        ));
        assert!(reconciler.cached().is_none());
    }

    #[test]
    fn test_delta_with_unexpected_manipulation() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        let other = DeltaResponse::new(226, "")
            .with_header("etag", "\"v2\"")
            .with_header("im", "vcdiff")
            .with_header("delta-base", VersionId::for_content("body 1").to_etag());
        assert!(reconciler.reconcile(&other).is_err());
    }

    #[test]
    fn test_unexpected_status() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        let err = reconciler
            .reconcile(&DeltaResponse::new(500, "oops"))
            .unwrap_err();
        assert!(matches!(err, DeltaError::Http(_)));
        assert!(!err.is_recoverable());
        // Transport errors leave the cache alone.
        assert!(reconciler.cached().is_some());
    }

    #[test]
    fn test_reset() {
        let mut reconciler = Reconciler::default();
        reconciler.reconcile(&full("body 1")).unwrap();
        reconciler.reset();
        assert!(reconciler.cached().is_none());
    }
}
