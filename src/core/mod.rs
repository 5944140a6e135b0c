//! Delta encoding for HTTP (RFC 3229).
//!
//! A server that keeps recent versions of each resource can answer a client
//! that already holds one of them with just the changes. This module tree
//! holds the pieces:
//!
//! - [`types`] - version ids, edit scripts, negotiation outcomes, responses
//! - [`diff`] - computing and applying edit scripts
//! - [`protocol`] - `If-None-Match`, `A-IM`, `IM` and `Delta-Base` handling
//! - [`server`] - version history and the axum middleware
//! - [`client`] - response reconciliation and a polling client
//!
//! # Flow
//!
//! ```text
//! GET /dashboard                     ──▶ handler renders "body 1"
//! ◀── 200, ETag: "h1", body 1            history: [h1]
//!
//! GET /dashboard
//!   If-None-Match: "h1"              ──▶ handler renders "body 2"
//!   A-IM: googlediffjson                 history: [h1, h2]
//! ◀── 226, ETag: "h2", Delta-Base: "h1", IM: googlediffjson
//!     {"source_len":6,"ops":[...]}
//! ```

pub mod diff;
pub mod error;
pub mod protocol;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;

pub use error::{DeltaError, Result};
pub use types::{DeltaResponse, EditOp, EditScript, Outcome, Version, VersionId};
