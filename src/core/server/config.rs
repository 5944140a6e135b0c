//! Configuration for the delta-encoding middleware and its version history.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `max_versions` | 32 | Versions retained per resource (oldest evicted first) |
//! | `max_age_secs` | none | Evict versions older than this, except the latest |
//! | `max_body_bytes` | 8 MiB | Largest handler body that will be buffered |
//! | `delta_token` | `googlediffjson` | Instance-manipulation token for `A-IM` / `IM` |
//! | `granularity` | `chars` | Diff alignment granularity |
//! | `id_scheme` | `content_hash` | How version ids are derived |
//!
//! # Examples
//!
//! ```
//! use delta_cache::server::DeltaConfig;
//!
//! let config = DeltaConfig {
//!     max_versions: 8,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! let config = DeltaConfig::from_json(r#"{"max_versions": 4, "granularity": "lines"}"#).unwrap();
//! assert_eq!(config.max_versions, 4);
//! assert_eq!(config.delta_token, "googlediffjson");
//! ```

use crate::core::diff::Granularity;
use crate::core::error::{DeltaError, Result};
use crate::core::protocol::constants::DEFAULT_DELTA_TOKEN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a resource history derives version ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// SHA-256 of the content. Identical content always gets the same id,
    /// across resources and restarts.
    #[default]
    ContentHash,
    /// A counter scoped to the resource, starting at 1.
    Sequence,
}

/// Delta-encoding configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Maximum number of versions retained per resource. Must be at least 1.
    pub max_versions: usize,

    /// Maximum age of a retained version in seconds. The latest version is
    /// always kept. Enforced whenever a version is added.
    pub max_age_secs: Option<u64>,

    /// Maximum response body size buffered for negotiation.
    ///
    /// Larger bodies fail the request: negotiation needs the complete body.
    pub max_body_bytes: usize,

    /// Token naming the edit-script format in `A-IM` and `IM`.
    pub delta_token: String,

    pub granularity: Granularity,

    pub id_scheme: IdScheme,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            max_versions: 32,
            max_age_secs: None,
            max_body_bytes: 8 * 1024 * 1024,
            delta_token: DEFAULT_DELTA_TOKEN.to_string(),
            granularity: Granularity::Chars,
            id_scheme: IdScheme::ContentHash,
        }
    }
}

impl DeltaConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DeltaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::Config`] for a zero `max_versions`,
    /// `max_age_secs` or `max_body_bytes`, or a `delta_token` that is empty
    /// or not a valid header token.
    pub fn validate(&self) -> Result<()> {
        if self.max_versions == 0 {
            return Err(DeltaError::Config(
                "max_versions must be at least 1".to_string(),
            ));
        }
        if self.max_age_secs == Some(0) {
            return Err(DeltaError::Config(
                "max_age_secs must be positive when set".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(DeltaError::Config(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        let token_ok = !self.delta_token.is_empty()
            && self
                .delta_token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
        if !token_ok {
            return Err(DeltaError::Config(format!(
                "delta_token {:?} is not a valid header token",
                self.delta_token
            )));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeltaConfig::default();
        assert_eq!(config.max_versions, 32);
        assert_eq!(config.max_age_secs, None);
        assert_eq!(config.delta_token, "googlediffjson");
        assert_eq!(config.granularity, Granularity::Chars);
        assert_eq!(config.id_scheme, IdScheme::ContentHash);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_versions_rejected() {
        let config = DeltaConfig {
            max_versions: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DeltaError::Config(_))));
    }

    #[test]
    fn test_zero_age_rejected() {
        let config = DeltaConfig {
            max_age_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_token_rejected() {
        for token in ["", "two words", "quote\""] {
            let config = DeltaConfig {
                delta_token: token.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted {:?}", token);
        }
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            DeltaConfig::from_json(r#"{"max_age_secs": 60, "id_scheme": "sequence"}"#).unwrap();
        assert_eq!(config.max_age(), Some(Duration::from_secs(60)));
        assert_eq!(config.id_scheme, IdScheme::Sequence);
        assert_eq!(config.max_versions, 32);
    }

    #[test]
    fn test_from_json_invalid_values() {
        assert!(matches!(
            DeltaConfig::from_json(r#"{"max_versions": 0}"#),
            Err(DeltaError::Config(_))
        ));
        assert!(matches!(
            DeltaConfig::from_json("not json"),
            Err(DeltaError::Json(_))
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let config = DeltaConfig {
            max_versions: 3,
            granularity: Granularity::Lines,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(DeltaConfig::from_json(&json).unwrap(), config);
    }
}
