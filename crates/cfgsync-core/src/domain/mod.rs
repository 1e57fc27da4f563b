//! Domain layer: pure settings types and logic.
//!
//! Nothing in here touches storage, the message channel, or the editor
//! process.  The host crate injects those as traits.

pub mod config;
pub mod diff;
pub mod schema;

pub use config::{Configuration, Delta, SchemaVersion, CURRENT_SCHEMA_VERSION};
pub use diff::compute_delta;
pub use schema::{SchemaError, SettingKind, SettingsSchema};
