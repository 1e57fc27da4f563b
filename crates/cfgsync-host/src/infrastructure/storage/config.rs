//! TOML-based configuration of the host process.
//!
//! Reads `HostConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\cfgsync\config.toml`
//! - Linux:    `~/.config/cfgsync/config.toml`
//! - macOS:    `~/Library/Application Support/cfgsync/config.toml`
//!
//! ```toml
//! log_level = "debug"
//!
//! [editor]
//! url = "https://example.net/watchface/config.htm"
//!
//! [storage]
//! path = "store.json"
//!
//! [schema]
//! path = "settings.toml"
//! ```
//!
//! Every field has a default, so a missing file or a file with only some
//! sections is valid.  Relative paths are resolved against the directory of
//! the config file.

use std::path::{Path, PathBuf};

use cfgsync_core::{SchemaError, SchemaVersion, SettingsSchema, CURRENT_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Name of the per-user directory holding the config and the store.
const APP_DIR: &str = "cfgsync";

/// Error type for host configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `editor.url` is not an absolute URL.
    #[error("invalid editor URL '{url}': {source}")]
    InvalidEditorUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The settings schema file is invalid.
    #[error("invalid settings schema at {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Where the settings editor page lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default = "default_editor_url")]
    pub url: String,
}

/// Location of the key-value store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Store file; defaults to `store.json` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Settings schema file and fallback version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaConfig {
    /// Optional schema TOML; when set, its `version` wins over `version` below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Schema version used when no schema file is configured.
    #[serde(default = "default_schema_version")]
    pub version: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_editor_url() -> String {
    "http://localhost/config.htm".to_string()
}
fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION.0
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            editor: EditorConfig::default(),
            storage: StorageConfig::default(),
            schema: SchemaConfig::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            url: default_editor_url(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: None,
            version: default_schema_version(),
        }
    }
}

impl HostConfig {
    /// Parses and validates `editor.url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEditorUrl`] when the URL is not absolute.
    pub fn editor_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.editor.url).map_err(|source| ConfigError::InvalidEditorUrl {
            url: self.editor.url.clone(),
            source,
        })
    }

    /// Resolves the store file path against `base_dir`.
    ///
    /// An unset or empty `storage.path` means `store.json` in `base_dir`.
    pub fn store_path(&self, base_dir: &Path) -> PathBuf {
        match non_empty(self.storage.path.as_deref()) {
            Some(path) => resolve_relative(base_dir, path),
            None => base_dir.join("store.json"),
        }
    }

    /// Loads the settings schema, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Schema`] if it is invalid.
    pub fn load_schema(&self, base_dir: &Path) -> Result<Option<SettingsSchema>, ConfigError> {
        let Some(path) = non_empty(self.schema.path.as_deref()) else {
            return Ok(None);
        };
        let path = resolve_relative(base_dir, path);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        SettingsSchema::from_toml_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::Schema { path, source })
    }

    /// The schema version snapshots are tagged with when no schema file
    /// supplies one.
    pub fn fallback_schema_version(&self) -> SchemaVersion {
        SchemaVersion(self.schema.version)
    }
}

/// `None` for an unset or empty path.
fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Joins `path` onto `base_dir` unless it is already absolute.
pub fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `HostConfig` from `path`, returning `HostConfig::default()` if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &HostConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory including the `cfgsync` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join(APP_DIR))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join(APP_DIR))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR)
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
