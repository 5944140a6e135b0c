//! Header names, status codes and media tokens used by delta encoding.

/// Header names, lowercase so they can feed `HeaderName::from_static`.
pub mod headers {
    pub const ETAG: &str = "etag";
    /// Request: instance manipulations the client accepts.
    pub const A_IM: &str = "a-im";
    /// Response: instance manipulations applied to the body.
    pub const IM: &str = "im";
    pub const DELTA_BASE: &str = "delta-base";
}

pub mod status {
    pub const OK: u16 = 200;
    /// RFC 3229 "IM Used".
    pub const IM_USED: u16 = 226;
    pub const NOT_MODIFIED: u16 = 304;
}

/// Default instance-manipulation token naming the JSON edit-script format.
pub const DEFAULT_DELTA_TOKEN: &str = "googlediffjson";

/// Media type of a serialized edit script.
pub const SCRIPT_CONTENT_TYPE: &str = "application/json";

/// `Cache-Control` directive an intermediary must understand before it
/// may cache a `226` response.
pub const IM_CACHE_DIRECTIVE: &str = "no-store, im";
