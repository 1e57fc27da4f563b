//! Host bridge: line-oriented adapters for the host primitives.
//!
//! The host process talks to whatever drives it (a phone companion shell, a
//! test harness, a pipe into another tool) through plain text lines:
//!
//! ```text
//! stdout  {"a":"1","b":"off"}                     ← JsonLinesChannel
//! stdout  open http://host/config.htm?%7B...%7D   ← StdoutLauncher
//! ```
//!
//! Both adapters are generic over `std::io::Write`, so tests capture their
//! output in a `Vec<u8>`.

pub mod channel;
pub mod launcher;

pub use channel::JsonLinesChannel;
pub use launcher::StdoutLauncher;
