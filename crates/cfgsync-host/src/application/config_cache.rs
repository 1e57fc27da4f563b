//! ConfigCache: the versioned snapshot slot and the save-time diff.
//!
//! The cache owns exactly one durable value, the snapshot stored under
//! [`SNAPSHOT_KEY`] in an injected [`KeyValueStore`].  Per edit session it is
//! read once to pre-fill the editor and once more, then overwritten, when the
//! editor closes.
//!
//! # Failure model
//!
//! Nothing in here returns an error to the caller.  A missing, unreadable,
//! corrupt or outdated snapshot is "absent" and the whole new configuration
//! becomes the delta.  A failed write is logged and the delta is still
//! returned; the next session then diffs against whatever the store still
//! holds.

use std::path::PathBuf;

use cfgsync_core::{
    compute_delta, encode_snapshot, parse_snapshot, Configuration, Delta, SchemaVersion, Snapshot,
    SNAPSHOT_KEY,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error type for key-value store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store contents could not be serialized.
    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Durable string key-value storage provided by the host.
///
/// Infrastructure implementations write to disk; tests use an in-memory map.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, or `None` if there is none.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).put(key, value)
    }
}

/// Versioned cache of the last saved configuration.
pub struct ConfigCache<S> {
    store: S,
    schema_version: SchemaVersion,
}

impl<S: KeyValueStore> ConfigCache<S> {
    /// Creates a cache over `store` that only trusts snapshots saved under
    /// `schema_version`.
    pub fn new(store: S, schema_version: SchemaVersion) -> Self {
        Self {
            store,
            schema_version,
        }
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the last saved configuration for pre-filling the editor.
    ///
    /// `None` when nothing was saved yet, when the stored value cannot be read
    /// or parsed, or when it was saved under another schema version.
    pub fn load_prefill_reference(&self) -> Option<Configuration> {
        self.load_valid_config()
    }

    /// Diffs `new_config` against the stored snapshot, then overwrites the
    /// snapshot with `new_config` tagged with the current schema version.
    ///
    /// Returns the settings that must be sent to the device.
    pub fn compute_and_persist(&mut self, new_config: &Configuration) -> Delta {
        let previous = self.load_valid_config();
        let delta = compute_delta(previous.as_ref(), new_config);

        debug!(
            changed = delta.len(),
            total = new_config.len(),
            full = previous.is_none(),
            "computed configuration delta"
        );

        self.persist(new_config);
        delta
    }

    fn persist(&mut self, config: &Configuration) {
        let snapshot = Snapshot::new(self.schema_version, config.clone());
        let raw = match encode_snapshot(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "failed to encode configuration snapshot");
                return;
            }
        };

        match self.store.put(SNAPSHOT_KEY, raw) {
            Ok(()) => debug!(version = %self.schema_version, "persisted configuration snapshot"),
            Err(e) => error!(error = %e, "failed to persist configuration snapshot"),
        }
    }

    fn load_valid_config(&self) -> Option<Configuration> {
        let raw = match self.store.get(SNAPSHOT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no configuration snapshot stored");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "could not read configuration snapshot; treating as absent");
                return None;
            }
        };

        let Some(snapshot) = parse_snapshot(&raw) else {
            warn!(len = raw.len(), "stored configuration snapshot is malformed; treating as absent");
            return None;
        };

        let stored_version = snapshot.version;
        let config = snapshot.into_config_for(self.schema_version);
        if config.is_none() {
            info!(
                stored = %stored_version,
                current = %self.schema_version,
                "discarding configuration snapshot from another schema version"
            );
        }
        config
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemoryKeyValueStore;

    fn cfg(pairs: &[(&str, &str)]) -> Configuration {
        pairs.iter().copied().collect()
    }

    fn stored_snapshot(store: &MemoryKeyValueStore) -> Snapshot {
        let raw = store.raw(SNAPSHOT_KEY).expect("snapshot stored");
        parse_snapshot(raw).expect("snapshot parses")
    }

    // ── load_prefill_reference ────────────────────────────────────────────────

    #[test]
    fn test_prefill_absent_on_empty_store() {
        let cache = ConfigCache::new(MemoryKeyValueStore::new(), SchemaVersion(4));
        assert!(cache.load_prefill_reference().is_none());
    }

    #[test]
    fn test_prefill_returns_config_of_matching_version() {
        // Arrange
        let store = MemoryKeyValueStore::new().with_entry(
            SNAPSHOT_KEY,
            r#"{"version":4,"config":"{\"a\":\"1\",\"b\":\"on\"}"}"#,
        );
        let cache = ConfigCache::new(store, SchemaVersion(4));

        // Act
        let prefill = cache.load_prefill_reference();

        // Assert
        assert_eq!(prefill, Some(cfg(&[("a", "1"), ("b", "on")])));
    }

    #[test]
    fn test_prefill_absent_on_version_mismatch() {
        let store = MemoryKeyValueStore::new()
            .with_entry(SNAPSHOT_KEY, r#"{"version":3,"config":"{\"a\":\"1\"}"}"#);
        let cache = ConfigCache::new(store, SchemaVersion(4));

        assert!(cache.load_prefill_reference().is_none());
    }

    #[test]
    fn test_prefill_absent_on_truncated_json() {
        let store = MemoryKeyValueStore::new().with_entry(SNAPSHOT_KEY, r#"{"version":4,"con"#);
        let cache = ConfigCache::new(store, SchemaVersion(4));

        assert!(cache.load_prefill_reference().is_none());
    }

    #[test]
    fn test_prefill_absent_when_store_read_fails() {
        let mut store = MemoryKeyValueStore::new()
            .with_entry(SNAPSHOT_KEY, r#"{"version":4,"config":"{\"a\":\"1\"}"}"#);
        store.fail_reads = true;
        let cache = ConfigCache::new(store, SchemaVersion(4));

        assert!(cache.load_prefill_reference().is_none());
    }

    #[test]
    fn test_prefill_does_not_write() {
        let cache = ConfigCache::new(MemoryKeyValueStore::new(), SchemaVersion(1));
        let _ = cache.load_prefill_reference();
        assert_eq!(cache.store().writes, 0);
    }

    // ── compute_and_persist ───────────────────────────────────────────────────

    #[test]
    fn test_first_save_returns_full_config_and_persists_it() {
        // Arrange
        let mut cache = ConfigCache::new(MemoryKeyValueStore::new(), SchemaVersion(4));
        let config = cfg(&[("a", "1"), ("b", "on")]);

        // Act
        let delta = cache.compute_and_persist(&config);

        // Assert
        assert_eq!(delta, Delta::full(&config));
        let snapshot = stored_snapshot(cache.store());
        assert_eq!(snapshot.version, SchemaVersion(4));
        assert_eq!(snapshot.config, config);
    }

    #[test]
    fn test_resave_of_same_config_yields_empty_delta() {
        let mut cache = ConfigCache::new(MemoryKeyValueStore::new(), SchemaVersion(1));
        let config = cfg(&[("a", "1"), ("b", "on")]);

        cache.compute_and_persist(&config);
        let second = cache.compute_and_persist(&config);

        assert!(second.is_empty());
        assert_eq!(cache.store().writes, 2, "every save overwrites the snapshot");
    }

    #[test]
    fn test_single_key_change_yields_minimal_delta() {
        // Arrange: prior snapshot {version:4, config:{"a":"1","b":"on"}}
        let store = MemoryKeyValueStore::new().with_entry(
            SNAPSHOT_KEY,
            r#"{"version":4,"config":"{\"a\":\"1\",\"b\":\"on\"}"}"#,
        );
        let mut cache = ConfigCache::new(store, SchemaVersion(4));
        let edited = cfg(&[("a", "1"), ("b", "off")]);

        // Act
        let delta = cache.compute_and_persist(&edited);

        // Assert
        assert_eq!(delta, cfg_delta(&[("b", "off")]));
        let snapshot = stored_snapshot(cache.store());
        assert_eq!(snapshot.version, SchemaVersion(4));
        assert_eq!(snapshot.config, edited);
    }

    #[test]
    fn test_version_bump_forces_full_resend() {
        // Arrange: save under v4, then reopen the same store under v5
        let mut cache = ConfigCache::new(MemoryKeyValueStore::new(), SchemaVersion(4));
        let config = cfg(&[("a", "1"), ("b", "on")]);
        cache.compute_and_persist(&config);
        let mut bumped = ConfigCache::new(cache.into_store(), SchemaVersion(4).next());

        // Act
        let delta = bumped.compute_and_persist(&config);

        // Assert
        assert_eq!(delta, Delta::full(&config));
        assert_eq!(stored_snapshot(bumped.store()).version, SchemaVersion(5));
    }

    #[test]
    fn test_malformed_snapshot_behaves_like_first_save() {
        let store = MemoryKeyValueStore::new().with_entry(SNAPSHOT_KEY, "{\"version\":4,\"config\":\"{");
        let mut cache = ConfigCache::new(store, SchemaVersion(4));
        let config = cfg(&[("a", "1")]);

        let delta = cache.compute_and_persist(&config);

        assert_eq!(delta, Delta::full(&config));
        assert_eq!(stored_snapshot(cache.store()).config, config);
    }

    #[test]
    fn test_write_failure_still_returns_delta() {
        // Arrange
        let mut store = MemoryKeyValueStore::new();
        store.fail_writes = true;
        let mut cache = ConfigCache::new(store, SchemaVersion(1));
        let config = cfg(&[("a", "1")]);

        // Act
        let delta = cache.compute_and_persist(&config);

        // Assert: the delta is returned and nothing was stored
        assert_eq!(delta, Delta::full(&config));
        assert!(cache.store().raw(SNAPSHOT_KEY).is_none());
    }

    #[test]
    fn test_cache_works_over_borrowed_store() {
        let mut store = MemoryKeyValueStore::new();
        {
            let mut cache = ConfigCache::new(&mut store, SchemaVersion(2));
            cache.compute_and_persist(&cfg(&[("a", "1")]));
        }
        assert!(store.raw(SNAPSHOT_KEY).is_some());
    }

    fn cfg_delta(pairs: &[(&str, &str)]) -> Delta {
        pairs.iter().copied().collect()
    }
}
