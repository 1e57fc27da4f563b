//! # cfgsync-core
//!
//! Shared library for cfgsync containing the settings data model, the delta
//! computation, the settings schema, and the codecs for the two text formats
//! the host handles: the persisted snapshot and the editor response.
//!
//! This crate has no dependencies on file systems, terminals, or the host's
//! message channel.  All I/O lives in `cfgsync-host`.
//!
//! # Architecture overview
//!
//! A watch face exposes a small settings form rendered in a web view (the
//! "editor").  When the user closes the editor, the host process receives the
//! edited settings as URL-encoded JSON and must forward them to the device.
//! Only the settings that actually changed since the last save are forwarded.
//!
//! - **`domain`** – The [`Configuration`] and [`Delta`] maps, the
//!   [`SchemaVersion`] tag, the pure diff ([`compute_delta`]) and the
//!   [`SettingsSchema`] describing the editor's entries.
//!
//! - **`protocol`** – How settings are written down: the persisted
//!   [`Snapshot`] record (`{"version": n, "config": "<json>"}`) and the editor
//!   response / editor URL encoding.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `cfgsync_core::Configuration` instead of the full module path.
pub use domain::config::{Configuration, Delta, SchemaVersion, CURRENT_SCHEMA_VERSION};
pub use domain::diff::compute_delta;
pub use domain::schema::{
    EnumOption, SchemaError, SettingEntry, SettingKind, SettingsSchema, SettingsSection,
    FIRST_MESSAGE_KEY,
};
pub use protocol::payload::{
    decode_editor_response, editor_url, encode_uri_component, passes_structural_check, PayloadError,
};
pub use protocol::snapshot::{encode_snapshot, parse_snapshot, Snapshot, SNAPSHOT_KEY};
