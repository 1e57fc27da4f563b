//! Persisted snapshot record.
//!
//! Exactly one snapshot is stored, under [`SNAPSHOT_KEY`] in the host's
//! key-value store.  Its text form is a JSON object whose `config` field is
//! itself the JSON text of the configuration:
//!
//! ```text
//! {"version":4,"config":"{\"a\":\"1\",\"b\":\"on\"}"}
//! ```
//!
//! Writing version and config as one value under one key keeps them in step:
//! there is no state in which a new config carries an old version.
//!
//! # Tolerant reading
//!
//! [`parse_snapshot`] never fails loudly.  Any text that is not valid JSON,
//! lacks a field, carries a non-integer version, or whose embedded config is
//! not a flat JSON object yields `None`, which callers treat exactly like "no
//! snapshot".  An inline JSON object in `config` is also accepted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::config::{Configuration, SchemaVersion};

/// Key under which the snapshot is stored.
pub const SNAPSHOT_KEY: &str = "config_snapshot";

/// The last saved configuration and the schema version it was saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub version: SchemaVersion,
    pub config: Configuration,
}

impl Snapshot {
    pub fn new(version: SchemaVersion, config: Configuration) -> Self {
        Self { version, config }
    }

    /// Returns the configuration if it was saved under `current`.
    pub fn into_config_for(self, current: SchemaVersion) -> Option<Configuration> {
        (self.version == current).then_some(self.config)
    }
}

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    version: SchemaVersion,
    config: &'a str,
}

#[derive(Deserialize)]
struct StoredSnapshot {
    version: SchemaVersion,
    config: StoredConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredConfig {
    Encoded(String),
    Inline(Configuration),
}

/// Encodes `snapshot` into its persisted text form.
///
/// # Errors
///
/// Propagates `serde_json` serialization errors.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    let config = snapshot.config.to_json()?;
    serde_json::to_string(&SnapshotRecord {
        version: snapshot.version,
        config: &config,
    })
}

/// Parses persisted snapshot text, returning `None` for anything malformed.
pub fn parse_snapshot(raw: &str) -> Option<Snapshot> {
    let stored: StoredSnapshot = match serde_json::from_str(raw) {
        Ok(stored) => stored,
        Err(e) => {
            debug!(error = %e, "persisted snapshot is not a valid record");
            return None;
        }
    };

    let config = match stored.config {
        StoredConfig::Inline(config) => config,
        StoredConfig::Encoded(text) => match serde_json::from_str::<Configuration>(&text) {
            Ok(config) => config,
            Err(e) => {
                debug!(error = %e, "persisted snapshot config is not a settings object");
                return None;
            }
        },
    };

    Some(Snapshot {
        version: stored.version,
        config,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
