//! Storage infrastructure: host config file and key-value stores.
//!
//! - `config`  reads and writes the host's TOML configuration file.
//! - `kv_file` persists the key-value store as a JSON object on disk.
//! - `memory`  keeps the key-value store in memory for tests and dry runs.

pub mod config;
pub mod kv_file;
pub mod memory;

pub use kv_file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
