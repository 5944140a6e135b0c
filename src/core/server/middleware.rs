//! Axum middleware for delta encoding.
//!
//! [`DeltaLayer`] wraps a router's handlers. For every `GET` it lets the
//! handler produce its body, buffers that body, records it as the
//! resource's newest version and rewrites the response into one of:
//!
//! | Outcome | Status | Body | Extra headers |
//! |---------|--------|------|---------------|
//! | Full | 200 | full content | `ETag` |
//! | NotModified | 304 | empty | `ETag` |
//! | Delta | 226 | JSON edit script | `ETag`, `IM`, `Delta-Base`, `Cache-Control` |
//!
//! A `HEAD` is not recorded; it carries the `ETag` of the latest version a
//! `GET` recorded for the same route.
//!
//! The rewritten response is returned to the outer layers like any other,
//! so tracing or logging layers wrapped around this one see the final
//! status and headers.
//!
//! # Examples
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use delta_cache::server::DeltaLayer;
//!
//! let delta = DeltaLayer::new();
//! let app: Router = Router::new()
//!     .route("/dashboard", get(|| async { "<h1>status</h1>" }))
//!     .layer(delta.middleware());
//! ```

use super::config::DeltaConfig;
use super::history::HistoryStore;
use crate::core::error::{DeltaError, Result};
use crate::core::protocol::{self, constants};
use crate::core::types::{Negotiation, Outcome, VersionId};
use axum::body::{Body, Bytes};
use axum::extract::{MatchedPath, Request};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{response::Parts, Method, StatusCode};
use axum::{middleware::Next, response::Response};
use std::sync::Arc;

async fn delta_middleware_handler(
    axum::extract::State(layer): axum::extract::State<DeltaLayer>,
    req: Request,
    next: Next,
) -> Response {
    layer.handle_middleware(req, next).await
}

/// Delta-encoding state extracted from request headers.
///
/// Inserted into request extensions as `Arc<DeltaRequest>` so handlers can
/// inspect what the client holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaRequest {
    /// Ids from `If-None-Match`, in header order.
    pub validators: Vec<VersionId>,
    /// Whether `A-IM` accepts the configured delta token.
    pub accepts_delta: bool,
}

impl DeltaRequest {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, delta_token: &str) -> Self {
        let validators = headers
            .get_all(header::IF_NONE_MATCH)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(protocol::parse_if_none_match)
            .collect();
        let accepts_delta = headers
            .get_all(constants::headers::A_IM)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| protocol::accepts_instance_manipulation(v, delta_token));
        DeltaRequest {
            validators,
            accepts_delta,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_validators(&self) -> bool {
        !self.validators.is_empty()
    }
}

/// Resource key for a request: the matched route pattern when available,
/// otherwise the request path.
fn resource_key(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Axum middleware layer for delta encoding.
#[derive(Clone, Debug)]
pub struct DeltaLayer {
    config: Arc<DeltaConfig>,
    store: HistoryStore,
}

impl DeltaLayer {
    /// Create a layer with the default configuration and a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(HistoryStore::new())
    }

    /// Create a layer with a custom configuration and a fresh store.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::Config`](crate::DeltaError::Config) if the
    /// configuration is invalid.
    pub fn with_config(config: DeltaConfig) -> Result<Self> {
        Ok(Self::with_store(HistoryStore::with_config(config)?))
    }

    /// Create a layer over an existing store, adopting its configuration.
    #[must_use]
    pub fn with_store(store: HistoryStore) -> Self {
        Self {
            config: Arc::new(store.config().clone()),
            store,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeltaConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    #[must_use]
    pub fn middleware(
        &self,
    ) -> impl tower::Layer<
        axum::routing::Route,
        Service = impl tower::Service<
            Request,
            Response = Response,
            Error = std::convert::Infallible,
            Future = impl Send + 'static,
        > + Clone
                      + Send
                      + Sync
                      + 'static,
    > + Clone {
        axum::middleware::from_fn_with_state(self.clone(), delta_middleware_handler)
    }

    async fn handle_middleware(&self, mut req: Request, next: Next) -> Response {
        if req.method() == Method::HEAD {
            let key = resource_key(&req);
            let response = next.run(req).await;
            return self.tag_head_response(&key, response);
        }
        if req.method() != Method::GET {
            return next.run(req).await;
        }

        let key = resource_key(&req);
        let delta_request = DeltaRequest::from_headers(req.headers(), &self.config.delta_token);
        let validators = delta_request.validators.clone();
        let accepts_delta = delta_request.accepts_delta;
        req.extensions_mut().insert(Arc::new(delta_request));

        let response = next.run(req).await;
        if response.status() != StatusCode::OK {
            return response;
        }

        let (parts, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, self.config.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = DeltaError::BodyBuffer(err.to_string());
                tracing::error!(
                    key = %key,
                    limit = self.config.max_body_bytes,
                    error = %err,
                    "failed to buffer response body"
                );
                return buffer_failure(&err);
            }
        };

        let Ok(text) = std::str::from_utf8(&bytes) else {
            tracing::debug!(key = %key, "response body is not UTF-8, skipping delta encoding");
            return Response::from_parts(parts, Body::from(bytes));
        };

        let handle = self.store.register_key(&key);
        match self.store.negotiate(&handle, text, &validators, accepts_delta) {
            Ok(negotiation) => self.write_response(parts, bytes, negotiation),
            Err(err) => {
                tracing::error!(key = %key, error = %err, "negotiation failed, sending full body");
                Response::from_parts(parts, Body::from(bytes))
            }
        }
    }

    /// `HEAD` bodies are stripped before this layer sees them, so nothing is
    /// recorded. The response carries the `ETag` of the latest recorded
    /// version, when there is one.
    fn tag_head_response(&self, key: &str, mut response: Response) -> Response {
        if response.status() != StatusCode::OK {
            return response;
        }
        let Some(handle) = self.store.get(key) else {
            return response;
        };
        if let Ok(latest) = self.store.latest(&handle) {
            insert_header(response.headers_mut(), header::ETAG, &latest.id.to_etag());
        }
        response
    }

    /// Rewrite the handler's response parts according to the outcome.
    fn write_response(
        &self,
        mut parts: Parts,
        full_body: Bytes,
        negotiation: Negotiation,
    ) -> Response {
        let Negotiation { id, outcome } = negotiation;
        insert_header(&mut parts.headers, header::ETAG, &id.to_etag());

        match outcome {
            Outcome::Full => {
                parts.status = StatusCode::OK;
                Response::from_parts(parts, Body::from(full_body))
            }
            Outcome::NotModified => {
                parts.status = StatusCode::NOT_MODIFIED;
                strip_content_headers(&mut parts.headers);
                Response::from_parts(parts, Body::empty())
            }
            Outcome::Delta { base, script } => {
                let json = match script.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to encode edit script, sending full body");
                        parts.status = StatusCode::OK;
                        return Response::from_parts(parts, Body::from(full_body));
                    }
                };
                parts.status = StatusCode::IM_USED;
                strip_content_headers(&mut parts.headers);
                insert_header(
                    &mut parts.headers,
                    header::CONTENT_TYPE,
                    constants::SCRIPT_CONTENT_TYPE,
                );
                insert_header(
                    &mut parts.headers,
                    HeaderName::from_static(constants::headers::IM),
                    &self.config.delta_token,
                );
                insert_header(
                    &mut parts.headers,
                    HeaderName::from_static(constants::headers::DELTA_BASE),
                    &base.to_etag(),
                );
                insert_header(
                    &mut parts.headers,
                    header::CACHE_CONTROL,
                    constants::IM_CACHE_DIRECTIVE,
                );
                Response::from_parts(parts, Body::from(json))
            }
        }
    }
}

impl Default for DeltaLayer {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "dropping invalid header value"),
    }
}

fn strip_content_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_TYPE);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
}

fn buffer_failure(err: &DeltaError) -> Response {
    let mut response = Response::new(Body::from(err.to_string()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    // ========== DeltaRequest Tests ==========

    #[test]
    fn test_delta_request_parses_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("if-none-match", HeaderValue::from_static("\"a\", \"b\""));
        headers.insert("a-im", HeaderValue::from_static("googlediffjson"));

        let state = DeltaRequest::from_headers(&headers, "googlediffjson");
        assert_eq!(
            state.validators,
            vec![VersionId::new("a"), VersionId::new("b")]
        );
        assert!(state.accepts_delta);
        assert!(state.has_validators());
    }

    #[test]
    fn test_delta_request_empty_headers() {
        let state = DeltaRequest::from_headers(&HeaderMap::new(), "googlediffjson");
        assert!(state.validators.is_empty());
        assert!(!state.accepts_delta);
        assert!(!state.has_validators());
    }

    #[test]
    fn test_delta_request_multiple_if_none_match_lines() {
        let mut headers = HeaderMap::new();
        headers.append("if-none-match", HeaderValue::from_static("\"a\""));
        headers.append("if-none-match", HeaderValue::from_static("\"b\""));
        let state = DeltaRequest::from_headers(&headers, "googlediffjson");
        assert_eq!(
            state.validators,
            vec![VersionId::new("a"), VersionId::new("b")]
        );
    }

    #[test]
    fn test_delta_request_other_token() {
        let mut headers = HeaderMap::new();
        headers.insert("a-im", HeaderValue::from_static("vcdiff"));
        let state = DeltaRequest::from_headers(&headers, "googlediffjson");
        assert!(!state.accepts_delta);
    }

    // ========== DeltaLayer Tests ==========

    #[test]
    fn test_delta_layer_new() {
        let layer = DeltaLayer::new();
        assert_eq!(layer.config(), &DeltaConfig::default());
        assert!(layer.store().is_empty());
    }

    #[test]
    fn test_delta_layer_with_invalid_config() {
        let config = DeltaConfig {
            max_versions: 0,
            ..Default::default()
        };
        assert!(DeltaLayer::with_config(config).is_err());
    }

    #[test]
    fn test_delta_layer_with_store_shares_histories() {
        let store = HistoryStore::new();
        let layer = DeltaLayer::with_store(store.clone());
        store.register_key("/doc");
        assert_eq!(layer.store().keys(), vec!["/doc".to_string()]);
    }

    #[test]
    fn test_strip_content_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));
        strip_content_headers(&mut headers);
        assert!(headers.get(header::CONTENT_TYPE).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
    }
}
