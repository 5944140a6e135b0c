//! Delta-encoding server support for axum.
//!
//! # Module Organization
//!
//! ```text
//! server/
//! ├── config      - DeltaConfig options and IdScheme
//! ├── history     - HistoryStore and ResourceHistory (bounded version history)
//! └── middleware  - DeltaLayer and DeltaRequest extractor
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DeltaLayer`] | Axum middleware layer |
//! | [`DeltaRequest`] | Validators and delta capability of a request |
//! | [`DeltaConfig`] | History bounds, body limit, delta token |
//! | [`HistoryStore`] | Per-resource version histories |
//!
//! # HTTP Status Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | 200 | Full representation |
//! | 226 | IM Used: edit script against `Delta-Base` |
//! | 304 | Not Modified |
//!
//! # Examples
//!
//! ```
//! use delta_cache::server::{DeltaConfig, DeltaLayer};
//!
//! let layer = DeltaLayer::with_config(DeltaConfig {
//!     max_versions: 16,
//!     ..Default::default()
//! })
//! .unwrap();
//! assert_eq!(layer.config().max_versions, 16);
//! ```

mod config;
mod history;
mod middleware;


pub use config::{DeltaConfig, IdScheme};
pub use history::{HistoryHandle, HistoryStore, ResourceHistory};
pub use middleware::{DeltaLayer, DeltaRequest};
