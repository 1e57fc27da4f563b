//! Infrastructure layer for the host process.
//!
//! Contains the adapters behind the application traits: the on-disk
//! key-value store, the host config file, and the line-oriented bridge that
//! carries device messages and editor URLs out of the process.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `cfgsync_core`, but MUST NOT be imported by the `application` layer outside
//! of tests.

pub mod host_bridge;
pub mod storage;
