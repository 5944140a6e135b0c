//! Polling HTTP client that keeps a reconciled copy of each resource.
//!
//! Provides [`DeltaClient`], which sends validator headers on every `GET`
//! and folds `200`, `304` and `226` responses into per-URL caches.

use super::reconciler::Reconciler;
use crate::core::error::Result;
use crate::core::protocol::constants::DEFAULT_DELTA_TOKEN;
use crate::core::types::{DeltaResponse, VersionId};
use http::HeaderMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP client that negotiates delta encoding.
///
/// Clones share the same caches.
///
/// # Examples
///
/// ```no_run
/// use delta_cache::client::DeltaClient;
///
/// # async fn run() -> delta_cache::Result<()> {
/// let client = DeltaClient::new();
/// let first = client.get("http://localhost:3000/dashboard").await?;
/// // Later polls transfer only the changes.
/// let second = client.get("http://localhost:3000/dashboard").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DeltaClient {
    client: reqwest::Client,
    delta_token: Arc<str>,
    reconcilers: Arc<Mutex<HashMap<String, Reconciler>>>,
}

impl DeltaClient {
    /// Create a client with a default `reqwest::Client`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Wrap an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        DeltaClient {
            client,
            delta_token: Arc::from(DEFAULT_DELTA_TOKEN),
            reconcilers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Advertise a different instance-manipulation token.
    ///
    /// Applies to resources first fetched after this call.
    #[must_use]
    pub fn with_delta_token(mut self, token: impl Into<String>) -> Self {
        self.delta_token = Arc::from(token.into());
        self
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch `url` and return its current content.
    ///
    /// When the response cannot be reconciled against the cached copy, the
    /// cache for `url` is dropped and the request is sent once more without
    /// a validator, which forces a full response.
    ///
    /// # Errors
    ///
    /// Transport failures, unexpected statuses, and a reconciliation
    /// failure on the retried request.
    pub async fn get(&self, url: &str) -> Result<String> {
        let headers = self.validator_headers(url);
        let response = self.fetch(url, headers).await?;

        let err = match self.reconcile(url, &response) {
            Ok(content) => return Ok(content),
            Err(err) if err.is_recoverable() => err,
            Err(err) => return Err(err),
        };

        tracing::warn!(
            url,
            status = response.status,
            error = %err,
            "delta reconciliation failed, re-fetching in full"
        );
        self.forget(url);
        let headers = self.validator_headers(url);
        let response = self.fetch(url, headers).await?;
        self.reconcile(url, &response)
    }

    /// Send a `GET` with the given headers and buffer the response.
    ///
    /// Does not touch the cache.
    pub async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<DeltaResponse> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status().as_u16();
        let header_map = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(url, status, bytes = body.len(), "fetched");
        Ok(DeltaResponse::from_parts(status, &header_map, body))
    }

    /// Id of the version cached for `url`, if any.
    #[must_use]
    pub fn cached_version(&self, url: &str) -> Option<VersionId> {
        self.reconcilers
            .lock()
            .get(url)
            .and_then(|r| r.cached_id().cloned())
    }

    /// Drop the cached copy of `url`.
    pub fn forget(&self, url: &str) {
        if let Some(reconciler) = self.reconcilers.lock().get_mut(url) {
            reconciler.reset();
        }
    }

    fn validator_headers(&self, url: &str) -> HeaderMap {
        let mut reconcilers = self.reconcilers.lock();
        reconcilers
            .entry(url.to_string())
            .or_insert_with(|| Reconciler::new(self.delta_token.as_ref()))
            .validator_headers()
    }

    fn reconcile(&self, url: &str, response: &DeltaResponse) -> Result<String> {
        let mut reconcilers = self.reconcilers.lock();
        let reconciler = reconcilers
            .entry(url.to_string())
            .or_insert_with(|| Reconciler::new(self.delta_token.as_ref()));
        reconciler.reconcile(response).map(str::to_string)
    }
}

impl Default for DeltaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_has_no_cache() {
        let client = DeltaClient::new();
        assert!(client.cached_version("http://localhost/x").is_none());
    }

    #[test]
    fn test_validator_headers_advertise_token() {
        let client = DeltaClient::new().with_delta_token("textdiff");
        let headers = client.validator_headers("http://localhost/x");
        assert_eq!(headers.get("a-im").unwrap(), "textdiff");
        assert!(headers.get("if-none-match").is_none());
    }

    #[test]
    fn test_reconcile_updates_shared_cache() {
        let client = DeltaClient::new();
        let clone = client.clone();
        let response = DeltaResponse::new(200, "hello").with_header("etag", "\"v1\"");
        assert_eq!(client.reconcile("http://localhost/x", &response).unwrap(), "hello");
        assert_eq!(
            clone.cached_version("http://localhost/x"),
            Some(VersionId::new("v1"))
        );

        clone.forget("http://localhost/x");
        assert!(client.cached_version("http://localhost/x").is_none());
    }
}
