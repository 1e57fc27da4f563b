//! Application layer for cfgsync-host.
//!
//! The application layer knows *what* happens when the host raises a
//! configuration event and delegates *how* to the infrastructure layer through
//! traits.
//!
//! # Responsibilities
//!
//! - Owning the versioned snapshot slot and computing deltas (`config_cache`)
//! - Reacting to ready / show / closed events (`session`)
//!
//! # What does NOT belong here?
//!
//! - Reading or writing files (infrastructure `storage`)
//! - Writing to stdout or talking to a device (infrastructure `host_bridge`)
//! - Parsing the command line (`main.rs`)

pub mod config_cache;
pub mod session;

pub use config_cache::{ConfigCache, KeyValueStore, StoreError};
pub use session::{
    ChannelError, ConfigSession, EditorLauncher, LaunchError, MessageChannel, SaveOutcome,
};
