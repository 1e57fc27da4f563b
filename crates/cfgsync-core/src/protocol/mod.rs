//! Text formats exchanged with the outside world.
//!
//! - `snapshot` – the single persisted `{"version", "config"}` record.
//! - `payload` – the editor's close response and the editor launch URL.

pub mod payload;
pub mod snapshot;
