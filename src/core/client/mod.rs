//! Delta-aware HTTP client.
//!
//! ```text
//! client/
//! ├── reconciler - per-resource cache folding 200 / 304 / 226 responses
//! └── fetch      - DeltaClient, a reqwest client keeping one reconciler per URL
//! ```
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Reconciler`] | Transport-independent reconciliation state |
//! | [`CachedVersion`] | The representation a client currently holds |
//! | [`DeltaClient`] | Polling client built on `reqwest` |

mod fetch;
mod reconciler;

pub use fetch::DeltaClient;
pub use reconciler::{CachedVersion, Reconciler};
