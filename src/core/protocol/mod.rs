//! Protocol-level utilities for delta encoding (RFC 3229).

pub mod constants;
pub mod headers;

pub use constants::{DEFAULT_DELTA_TOKEN, SCRIPT_CONTENT_TYPE};
pub use headers::*;
