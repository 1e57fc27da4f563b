//! In-memory key-value store for unit testing.
//!
//! The `MemoryKeyValueStore` replaces the on-disk store with a plain map and
//! counts writes, so tests can assert exactly what was persisted and how
//! often.
//!
//! # Failure flags
//!
//! Set `fail_reads` or `fail_writes` to make every `get` / `put` return a
//! [`StoreError::Backend`].  This exercises the "treat as absent" and "log and
//! carry on" paths of the cache without a broken disk.

use std::collections::BTreeMap;

use crate::application::config_cache::{KeyValueStore, StoreError};

/// A store that keeps everything in a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
    /// Number of successful `put` calls.
    pub writes: usize,
    /// When `true`, every `get` fails.
    pub fail_reads: bool,
    /// When `true`, every `put` fails and nothing is stored.
    pub fail_writes: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `key` with `value` without counting it as a write.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    /// The raw value stored under `key`, bypassing the failure flags.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Backend("mock read failure".into()));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("mock write failure".into()));
        }
        self.entries.insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}
