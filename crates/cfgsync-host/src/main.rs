//! cfgsync-host entry point.
//!
//! Each invocation handles one host event and exits:
//!
//! ```text
//! cfgsync-host [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show-config              Print the editor URL, pre-filled with the last save
//!   editor-closed <RESPONSE> Persist the editor response and print the delta
//!   prefill                  Print the last valid saved configuration as JSON
//!   defaults                 Print the schema's default configuration as JSON
//!
//! Options:
//!   --config <PATH>  Host config file   [env: CFGSYNC_CONFIG]
//!   --store  <PATH>  Key-value store    [env: CFGSYNC_STORE]
//! ```
//!
//! Stdout carries only machine-readable lines (device messages and
//! `open <url>` lines); logs go to stderr.  The log level comes from
//! `RUST_LOG`, falling back to `log_level` in the config file.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cfgsync_core::SettingsSchema;
use cfgsync_host::application::{ConfigCache, ConfigSession, SaveOutcome};
use cfgsync_host::infrastructure::host_bridge::{JsonLinesChannel, StdoutLauncher};
use cfgsync_host::infrastructure::storage::config::{config_file_path, load_config};
use cfgsync_host::infrastructure::storage::FileKeyValueStore;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Companion host for cfgsync settings pages.
#[derive(Debug, Parser)]
#[command(
    name = "cfgsync-host",
    about = "Opens the settings editor and forwards changed settings to the device",
    version
)]
struct Cli {
    /// Path to the host config file.
    ///
    /// Defaults to `config.toml` in the platform config directory.
    #[arg(long, env = "CFGSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the key-value store file, overriding `storage.path`.
    #[arg(long, env = "CFGSYNC_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Open the settings editor, pre-filled with the last valid save.
    ShowConfig,

    /// Handle the editor closing with RESPONSE (`-` reads it from stdin).
    EditorClosed { response: String },

    /// Print the last valid saved configuration, if any.
    Prefill,

    /// Print the default configuration declared by the settings schema.
    Defaults,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("failed to locate the host config file")?,
    };
    let config = load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level))
        .with_writer(std::io::stderr)
        .init();

    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let schema = config
        .load_schema(&base_dir)
        .context("failed to load the settings schema")?;
    let schema_version = schema
        .as_ref()
        .map_or_else(|| config.fallback_schema_version(), SettingsSchema::version);

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.store_path(&base_dir));
    let store = FileKeyValueStore::open(&store_path)
        .with_context(|| format!("failed to open store at {}", store_path.display()))?;
    let editor_base = config.editor_url()?;

    info!(
        config = %config_path.display(),
        store = %store_path.display(),
        version = %schema_version,
        "cfgsync-host starting"
    );

    let defaults = schema.as_ref().map(|schema| schema.defaults().clone());

    let mut session = ConfigSession::new(
        ConfigCache::new(store, schema_version),
        JsonLinesChannel::new(std::io::stdout()),
        StdoutLauncher::new(std::io::stdout()),
        editor_base,
    );
    if let Some(schema) = schema {
        session = session.with_schema(schema);
    }
    session.ready();

    match cli.command {
        Command::ShowConfig => {
            session
                .show_configuration()
                .context("failed to open the settings editor")?;
        }
        Command::EditorClosed { response } => {
            let response = read_response(&response, std::io::stdin())
                .context("failed to read the editor response from stdin")?;
            match session.editor_closed(&response) {
                SaveOutcome::Rejected => info!("editor response rejected"),
                SaveOutcome::Unchanged => info!("no settings changed"),
                SaveOutcome::Sent(delta) => info!(changed = delta.len(), "settings forwarded"),
                SaveOutcome::SendFailed(delta) => {
                    info!(changed = delta.len(), "settings saved but not forwarded")
                }
            }
        }
        Command::Prefill => {
            if let Some(prefill) = session.cache().load_prefill_reference() {
                println!("{}", prefill.to_json()?);
            }
        }
        Command::Defaults => {
            let Some(defaults) = defaults else {
                bail!(
                    "no settings schema configured (set schema.path in {})",
                    config_path.display()
                );
            };
            println!("{}", defaults.to_json()?);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level, then `info`.
fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Returns `arg`, or all of `stdin` when `arg` is `-`.
fn read_response(arg: &str, mut stdin: impl Read) -> std::io::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut response = String::new();
    stdin.read_to_string(&mut response)?;
    Ok(response.trim_end_matches(['\r', '\n']).to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
