//! cfgsync-host library entry point.
//!
//! The host process sits between a settings editor page and a device that
//! only understands flat string-keyed messages.  It remembers the last saved
//! configuration and forwards only the settings that changed.
//!
//! # Architecture
//!
//! ```text
//! main.rs (clap CLI)
//!  └─ application::ConfigSession
//!       ├─ ConfigCache ──► KeyValueStore     (storage::FileKeyValueStore)
//!       ├─ MessageChannel                    (host_bridge::JsonLinesChannel)
//!       └─ EditorLauncher                    (host_bridge::StdoutLauncher)
//! ```
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;
