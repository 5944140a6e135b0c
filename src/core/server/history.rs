//! Per-resource version history with thread-safe access.
//!
//! This module keeps, for every resource key, a bounded ordered collection of
//! content snapshots and answers the two questions negotiation needs: "is
//! this id still known?" and "what script turns it into the latest version?".
//!
//! # Thread Safety
//!
//! The key map sits behind a `parking_lot::Mutex` that is held only long
//! enough to look up or insert a handle. Each history has its own
//! `parking_lot::RwLock`, so requests for unrelated keys never wait on each
//! other. [`HistoryStore::negotiate`] adds the new version and resolves the
//! client's validators under a single lock acquisition, which keeps
//! `has_version` and `script_from` consistent under concurrent writes.
//!
//! # Resource Lifecycle
//!
//! Histories are created lazily on first access and live until
//! [`HistoryStore::purge`], [`HistoryStore::clear`] or until the store is
//! dropped. Each history is bounded by `max_versions` and, optionally,
//! `max_age_secs`; the oldest versions go first and the latest is never
//! evicted.
//!
//! # Examples
//!
//! ```
//! use delta_cache::server::HistoryStore;
//! use delta_cache::diff::apply;
//!
//! let store = HistoryStore::new();
//! let handle = store.register_key("/dashboard");
//!
//! let v1 = store.add_version(&handle, "body 1");
//! let _v2 = store.add_version(&handle, "body 2");
//!
//! let script = store.script_from(&handle, &v1).unwrap();
//! assert_eq!(apply("body 1", &script).unwrap(), "body 2");
//! ```

use super::config::{DeltaConfig, IdScheme};
use crate::core::diff;
use crate::core::error::{DeltaError, Result};
use crate::core::types::{EditScript, Negotiation, Outcome, Version, VersionId};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Shared handle to one resource's history.
pub type HistoryHandle = Arc<RwLock<ResourceHistory>>;

/// The ordered versions of a single resource.
///
/// # Invariants
///
/// - Ids are unique within the history.
/// - A retained id always maps to the content it was first issued for.
/// - The last element is the latest version.
/// - `versions.len() <= max_versions`.
#[derive(Debug)]
pub struct ResourceHistory {
    key: String,
    versions: VecDeque<Version>,
    next_seq: u64,
    config: Arc<DeltaConfig>,
}

impl ResourceHistory {
    #[must_use]
    pub fn new(key: impl Into<String>, config: Arc<DeltaConfig>) -> Self {
        Self {
            key: key.into(),
            versions: VecDeque::new(),
            next_seq: 0,
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Retained ids, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &VersionId> {
        self.versions.iter().map(|v| &v.id)
    }

    /// Record `content` as the latest version and return its id.
    ///
    /// Content equal to the current latest version is not appended again;
    /// its existing id is returned. Under [`IdScheme::ContentHash`], content
    /// equal to an older retained version moves that version to the latest
    /// position and keeps its id.
    pub fn add_version(&mut self, content: &str) -> VersionId {
        if let Some(latest) = self.versions.back() {
            if &*latest.content == content {
                return latest.id.clone();
            }
        }

        let id = match self.config.id_scheme {
            IdScheme::ContentHash => VersionId::for_content(content),
            IdScheme::Sequence => {
                self.next_seq += 1;
                VersionId::sequence(self.next_seq)
            }
        };

        let version = match self.position(&id).and_then(|pos| self.versions.remove(pos)) {
            Some(mut existing) => {
                existing.created_at = Instant::now();
                existing
            }
            None => Version::new(id.clone(), content),
        };
        self.versions.push_back(version);

        let evicted = self.evict();
        if evicted > 0 {
            tracing::debug!(
                key = %self.key,
                evicted,
                retained = self.versions.len(),
                "evicted old versions"
            );
        }
        id
    }

    /// Drop versions beyond `max_versions` or older than `max_age`,
    /// oldest first, never the latest. Returns how many were dropped.
    fn evict(&mut self) -> usize {
        let before = self.versions.len();
        let max_versions = self.config.max_versions.max(1);
        while self.versions.len() > max_versions {
            self.versions.pop_front();
        }
        if let Some(max_age) = self.config.max_age() {
            while self.versions.len() > 1
                && self
                    .versions
                    .front()
                    .is_some_and(|v| v.created_at.elapsed() > max_age)
            {
                self.versions.pop_front();
            }
        }
        before - self.versions.len()
    }

    fn position(&self, id: &VersionId) -> Option<usize> {
        self.versions.iter().position(|v| &v.id == id)
    }

    #[must_use]
    pub fn has_version(&self, id: &VersionId) -> bool {
        self.position(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: &VersionId) -> Option<&Version> {
        self.versions.iter().find(|v| &v.id == id)
    }

    /// The most recently added version.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::EmptyHistory`] if nothing was ever added.
    pub fn latest(&self) -> Result<&Version> {
        self.versions
            .back()
            .ok_or_else(|| DeltaError::EmptyHistory(self.key.clone()))
    }

    /// Edit script from version `id` to the latest version.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::UnknownVersion`] if `id` is not retained and
    /// [`DeltaError::EmptyHistory`] if the history is empty.
    pub fn script_from(&self, id: &VersionId) -> Result<EditScript> {
        let base = self.get(id).ok_or_else(|| DeltaError::UnknownVersion {
            key: self.key.clone(),
            id: id.to_string(),
        })?;
        let latest = self.latest()?;
        if base.id == latest.id {
            return Ok(EditScript::identity(base.content.chars().count()));
        }
        Ok(diff::diff_with(
            &base.content,
            &latest.content,
            self.config.granularity,
        ))
    }

    /// First validator, in the client's order, that names a retained version.
    #[must_use]
    pub fn first_match<'a>(&self, validators: &'a [VersionId]) -> Option<&'a VersionId> {
        validators.iter().find(|id| self.has_version(id))
    }

    /// Decide the response shape for a client holding `validators`.
    ///
    /// `304` depends only on the script being empty; delta capability
    /// matters only when the content changed.
    pub fn resolve(&self, validators: &[VersionId], accepts_delta: bool) -> Result<Outcome> {
        let Some(matched) = self.first_match(validators) else {
            return Ok(Outcome::Full);
        };
        let script = self.script_from(matched)?;
        if script.is_empty() {
            Ok(Outcome::NotModified)
        } else if accepts_delta {
            Ok(Outcome::Delta {
                base: matched.clone(),
                script,
            })
        } else {
            Ok(Outcome::Full)
        }
    }
}

/// Thread-safe registry of resource histories.
///
/// Cloning creates a new handle to the same histories. A `DeltaLayer`
/// owns one store; pass a clone to [`DeltaLayer::with_store`] to share it.
///
/// [`DeltaLayer::with_store`]: crate::server::DeltaLayer::with_store
#[derive(Clone, Debug)]
pub struct HistoryStore {
    config: Arc<DeltaConfig>,
    histories: Arc<Mutex<HashMap<String, HistoryHandle>>>,
}

impl HistoryStore {
    /// Create an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(DeltaConfig::default())
    }

    /// Create an empty store with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::Config`] if the configuration is invalid.
    pub fn with_config(config: DeltaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: DeltaConfig) -> Self {
        Self {
            config: Arc::new(config),
            histories: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeltaConfig {
        &self.config
    }

    // ========== Key Lifecycle ==========

    /// Get the history for `key`, creating an empty one if needed.
    #[must_use]
    pub fn register_key(&self, key: &str) -> HistoryHandle {
        let mut histories = self.histories.lock();
        histories
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(key, "created resource history");
                Arc::new(RwLock::new(ResourceHistory::new(key, self.config.clone())))
            })
            .clone()
    }

    /// Get the history for `key` without creating it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<HistoryHandle> {
        self.histories.lock().get(key).cloned()
    }

    /// Drop the history for `key`. Returns whether it existed.
    pub fn purge(&self, key: &str) -> bool {
        self.histories.lock().remove(key).is_some()
    }

    /// Drop every history.
    pub fn clear(&self) {
        self.histories.lock().clear();
    }

    /// Keys with a history, in arbitrary order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.histories.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.histories.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.lock().is_empty()
    }

    // ========== Version Operations ==========

    /// Record `content` as the latest version of the handle's resource.
    pub fn add_version(&self, handle: &HistoryHandle, content: &str) -> VersionId {
        handle.write().add_version(content)
    }

    #[must_use]
    pub fn has_version(&self, handle: &HistoryHandle, id: &VersionId) -> bool {
        handle.read().has_version(id)
    }

    /// Snapshot of the latest version.
    pub fn latest(&self, handle: &HistoryHandle) -> Result<Version> {
        handle.read().latest().cloned()
    }

    /// Edit script from `id` to the latest version.
    pub fn script_from(&self, handle: &HistoryHandle, id: &VersionId) -> Result<EditScript> {
        handle.read().script_from(id)
    }

    /// Record `content` and decide the response for a client holding
    /// `validators`, atomically with respect to other requests on the same
    /// resource.
    ///
    /// The write lock taken to add the version is downgraded, without
    /// releasing it, to a read lock for the lookup and diff.
    pub fn negotiate(
        &self,
        handle: &HistoryHandle,
        content: &str,
        validators: &[VersionId],
        accepts_delta: bool,
    ) -> Result<Negotiation> {
        let mut history = handle.write();
        let id = history.add_version(content);
        let history = RwLockWriteGuard::downgrade(history);

        let outcome = history.resolve(validators, accepts_delta)?;

        if let Outcome::Delta { base, script } = &outcome {
            let stats = script.stats();
            tracing::debug!(
                key = history.key(),
                id = %id,
                base = %base,
                status = outcome.status(),
                inserted = stats.chars_inserted,
                deleted = stats.chars_deleted,
                unchanged = stats.chars_unchanged,
                versions = history.len(),
                "negotiated response"
            );
        } else {
            tracing::debug!(
                key = history.key(),
                id = %id,
                status = outcome.status(),
                outcome = outcome.label(),
                versions = history.len(),
                "negotiated response"
            );
        }

        Ok(Negotiation { id, outcome })
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
