//! Core data types for delta encoding.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`VersionId`] | Content-derived identifier, used as the `ETag` |
//! | [`Version`] | Immutable snapshot of a resource's text |
//! | [`EditScript`] / [`EditOp`] | Ordered equal/insert/delete operations |
//! | [`Outcome`] / [`Negotiation`] | Per-request response decision |
//! | [`DeltaResponse`] | Response as seen by a delta-aware client |

mod edit_script;
mod outcome;
mod response;
mod version;

pub use bytes::Bytes;
pub use edit_script::{EditOp, EditScript, ScriptStats};
pub use outcome::{Negotiation, Outcome};
pub use response::DeltaResponse;
pub use version::{Version, VersionId};
