//! Settings maps and the schema version tag.
//!
//! A [`Configuration`] is the flat `setting-name → value` map the editor emits
//! at the end of an edit session.  Values are opaque strings at this layer:
//! booleans arrive as `"0"`/`"1"`, enumerations as the option ordinal, free
//! text as-is.
//!
//! A [`Delta`] has the same shape but only holds the settings that must be
//! sent to the device.
//!
//! # Scalar normalisation
//!
//! The editor always emits strings, but older editor pages emitted bare JSON
//! numbers and booleans for some controls.  Those are accepted and stored in
//! their string form (`1` → `"1"`, `true` → `"true"`), so `"1"` and `1` compare
//! equal when diffing.  Nested arrays and objects are rejected.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Compatibility generation of the configuration key set.
///
/// Bumped by hand whenever the set or meaning of setting keys changes
/// incompatibly.  A persisted snapshot tagged with any other version is
/// discarded; there is no migration between versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub u32);

/// Schema version used when no settings schema file overrides it.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = SchemaVersion(1);

impl SchemaVersion {
    /// The version that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        CURRENT_SCHEMA_VERSION
    }
}

/// A scalar setting value as it may appear in editor JSON.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

impl ScalarValue {
    fn into_text(self) -> String {
        match self {
            ScalarValue::Text(text) => text,
            ScalarValue::Flag(flag) => flag.to_string(),
            ScalarValue::Integer(n) => n.to_string(),
            ScalarValue::Float(f) => f.to_string(),
        }
    }
}

fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ScalarValue>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into_text())).collect())
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// The full set of settings produced by one edit session.
///
/// Keys are kept sorted so serialized output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    entries: BTreeMap<String, String>,
}

impl<'de> Deserialize<'de> for Configuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_scalar_map(deserializer).map(|entries| Self { entries })
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Serializes the configuration as a compact JSON object.
    ///
    /// # Errors
    ///
    /// Only fails if `serde_json` fails to write a string map, which it does
    /// not do in practice; the error is still propagated.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl IntoIterator for Configuration {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ── Delta ─────────────────────────────────────────────────────────────────────

/// The settings that must be sent to the device after an edit session.
///
/// Either every key of the new [`Configuration`] (first save, corrupt or
/// outdated snapshot) or only the keys whose value changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Delta {
    entries: BTreeMap<String, String>,
}

impl Delta {
    /// A delta holding every setting of `config`.
    pub fn full(config: &Configuration) -> Self {
        Self {
            entries: config.as_map().clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The flat string-keyed mapping handed to the message channel.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Delta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
