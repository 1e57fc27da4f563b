//! Settings schema: the entries the editor renders.
//!
//! The schema is a TOML file listing the settings grouped in sections.  It is
//! the single place where the schema version lives, so adding or re-purposing
//! an entry and bumping the version happen in the same edit:
//!
//! ```toml
//! version = 3
//!
//! [[sections]]
//! title = "Display"
//!
//! [[sections.entries]]
//! key = "invert"
//! label = "Invert colours"
//! kind = "slider"
//! values = "false"
//!
//! [[sections.entries]]
//! key = "hour_format"
//! label = "Hour format"
//! kind = "select"
//! values = "auto|auto=Follow phone|h12=12 hours|h24=24 hours"
//! ```
//!
//! # Entry kinds
//!
//! | Kind       | Editor control      | `values`                         | Default        |
//! |------------|---------------------|----------------------------------|----------------|
//! | `slider`   | on/off switch       | `"true"` or anything else        | `"1"` / `"0"`  |
//! | `checkbox` | checkbox            | `"true"` or anything else        | `"1"` / `"0"`  |
//! | `oneshot`  | one-time action box | ignored                          | `"0"`          |
//! | `select`   | drop-down           | `default|name=Label|name=Label…` | default ordinal|
//! | `radio`    | radio group         | `default|name=Label|name=Label…` | default ordinal|
//!
//! Enumerated options are numbered from 0 in declaration order and the editor
//! submits the ordinal, not the name.  Every entry also gets a numeric message
//! key, counted from [`FIRST_MESSAGE_KEY`] in declaration order across all
//! sections; the device addresses settings by that number.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{Configuration, SchemaVersion};

/// Message key assigned to the first schema entry.
///
/// Key 0 is reserved for the configuration message itself.
pub const FIRST_MESSAGE_KEY: u32 = 1;

/// Error type for settings schema loading and validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The TOML content could not be parsed.
    #[error("failed to parse settings schema TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("an entry in section '{section}' has an empty key")]
    EmptyKey { section: String },

    #[error("duplicate setting key '{0}'")]
    DuplicateKey(String),

    /// A `select` or `radio` entry declares no options.
    #[error("setting '{0}' has no options")]
    NoOptions(String),

    #[error("setting '{key}' has malformed option '{option}' (expected name=Label)")]
    MalformedOption { key: String, option: String },

    #[error("setting '{key}' declares option '{option}' twice")]
    DuplicateOption { key: String, option: String },

    #[error("setting '{key}' defaults to unknown option '{default}'")]
    UnknownDefault { key: String, default: String },
}

/// The editor control backing a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Slider,
    Checkbox,
    Select,
    Radio,
    /// A checkbox the device clears again after acting on it once.
    Oneshot,
}

impl SettingKind {
    /// `true` for kinds whose value is an option ordinal.
    pub fn is_enumerated(self) -> bool {
        matches!(self, SettingKind::Select | SettingKind::Radio)
    }
}

/// One setting as declared in the schema file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub label: String,
    pub kind: SettingKind,
    #[serde(default)]
    pub values: String,
}

/// A titled group of settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SettingsSection {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<SettingEntry>,
}

/// One choice of an enumerated setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    pub name: String,
    pub label: String,
    /// The value the editor submits for this option.
    pub ordinal: u32,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    version: SchemaVersion,
    #[serde(default)]
    sections: Vec<SettingsSection>,
}

/// A validated settings schema.
#[derive(Debug, Clone)]
pub struct SettingsSchema {
    version: SchemaVersion,
    sections: Vec<SettingsSection>,
    options: BTreeMap<String, Vec<EnumOption>>,
    defaults: Configuration,
    message_keys: BTreeMap<String, u32>,
}

impl SettingsSchema {
    /// Parses and validates a schema from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] for malformed TOML and one of the
    /// validation variants when an entry is inconsistent.
    pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = toml::from_str(text)?;
        Self::new(file.version, file.sections)
    }

    /// Validates `sections` and derives option ordinals, defaults and message keys.
    ///
    /// # Errors
    ///
    /// See [`SchemaError`] for the validation failures.
    pub fn new(version: SchemaVersion, sections: Vec<SettingsSection>) -> Result<Self, SchemaError> {
        let mut seen = BTreeSet::new();
        let mut options = BTreeMap::new();
        let mut defaults = Configuration::new();
        let mut message_keys = BTreeMap::new();
        let mut next_key = FIRST_MESSAGE_KEY;

        for section in &sections {
            for entry in &section.entries {
                if entry.key.trim().is_empty() {
                    return Err(SchemaError::EmptyKey {
                        section: section.title.clone(),
                    });
                }
                if !seen.insert(entry.key.clone()) {
                    return Err(SchemaError::DuplicateKey(entry.key.clone()));
                }

                let default = if entry.kind.is_enumerated() {
                    let (default_name, entry_options) = parse_options(entry)?;
                    let ordinal = entry_options
                        .iter()
                        .find(|o| o.name == default_name)
                        .map(|o| o.ordinal)
                        .ok_or_else(|| SchemaError::UnknownDefault {
                            key: entry.key.clone(),
                            default: default_name.to_string(),
                        })?;
                    options.insert(entry.key.clone(), entry_options);
                    ordinal.to_string()
                } else if entry.kind == SettingKind::Oneshot {
                    "0".to_string()
                } else if entry.values.trim() == "true" {
                    "1".to_string()
                } else {
                    "0".to_string()
                };

                defaults.insert(entry.key.clone(), default);
                message_keys.insert(entry.key.clone(), next_key);
                next_key += 1;
            }
        }

        Ok(Self {
            version,
            sections,
            options,
            defaults,
            message_keys,
        })
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn sections(&self) -> &[SettingsSection] {
        &self.sections
    }

    /// Iterates over every entry in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &SettingEntry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    pub fn entry(&self, key: &str) -> Option<&SettingEntry> {
        self.entries().find(|e| e.key == key)
    }

    /// The options of an enumerated setting, or `None` for other kinds and
    /// unknown keys.
    pub fn options(&self, key: &str) -> Option<&[EnumOption]> {
        self.options.get(key).map(Vec::as_slice)
    }

    /// The configuration the editor shows when nothing was saved yet.
    pub fn defaults(&self) -> &Configuration {
        &self.defaults
    }

    /// Numeric message keys by setting name.
    pub fn message_keys(&self) -> &BTreeMap<String, u32> {
        &self.message_keys
    }

    pub fn message_key(&self, key: &str) -> Option<u32> {
        self.message_keys.get(key).copied()
    }

    /// Keys of `config` that the schema does not declare.
    pub fn unknown_keys(&self, config: &Configuration) -> Vec<String> {
        config
            .keys()
            .filter(|k| !self.message_keys.contains_key(*k))
            .map(str::to_string)
            .collect()
    }
}

/// Splits `default|name=Label|…` into the default name and numbered options.
fn parse_options(entry: &SettingEntry) -> Result<(&str, Vec<EnumOption>), SchemaError> {
    let mut parts = entry.values.split('|');
    let default_name = parts.next().unwrap_or_default().trim();

    let mut options: Vec<EnumOption> = Vec::new();
    for raw in parts {
        let (name, label) = raw
            .split_once('=')
            .ok_or_else(|| SchemaError::MalformedOption {
                key: entry.key.clone(),
                option: raw.to_string(),
            })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::MalformedOption {
                key: entry.key.clone(),
                option: raw.to_string(),
            });
        }
        if options.iter().any(|o| o.name == name) {
            return Err(SchemaError::DuplicateOption {
                key: entry.key.clone(),
                option: name.to_string(),
            });
        }
        let ordinal = options.len() as u32;
        options.push(EnumOption {
            name: name.to_string(),
            label: label.trim().to_string(),
            ordinal,
        });
    }

    if options.is_empty() {
        return Err(SchemaError::NoOptions(entry.key.clone()));
    }
    Ok((default_name, options))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
