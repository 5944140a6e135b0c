//! delta_cache: RFC 3229 delta encoding for axum servers and reqwest clients.
//!
//! - **server**: a bounded per-resource version history and a middleware
//!   layer that answers `200`, `304` or `226 IM Used`.
//! - **client**: a reconciler that rebuilds the current representation
//!   from edit scripts, plus a polling client built on it.
//!
//! # Quick Start
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use delta_cache::DeltaLayer;
//!
//! # async fn run() -> std::io::Result<()> {
//! let delta = DeltaLayer::new();
//! let app = Router::new()
//!     .route("/dashboard", get(|| async { "<h1>all systems nominal</h1>" }))
//!     .layer(delta.middleware());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await
//! # }
//! ```

pub mod core;

// Top-level re-exports for common usage
pub use crate::core::diff;
pub use crate::core::error::{DeltaError, Result};
pub use crate::core::protocol;
pub use crate::core::types;
pub use crate::core::types::{
    DeltaResponse, EditOp, EditScript, Negotiation, Outcome, ScriptStats, Version, VersionId,
};

#[cfg(feature = "server")]
pub use crate::core::server;
#[cfg(feature = "server")]
pub use crate::core::server::{DeltaConfig, DeltaLayer, HistoryStore};

#[cfg(feature = "client")]
pub use crate::core::client;
#[cfg(feature = "client")]
pub use crate::core::client::{DeltaClient, Reconciler};
