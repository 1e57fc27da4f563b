//! `EditorLauncher` that announces the editor URL as an `open <url>` line.

use std::io::Write;

use tracing::debug;
use url::Url;

use crate::application::session::{EditorLauncher, LaunchError};

/// Prefix of every line written by [`StdoutLauncher`].
pub const OPEN_PREFIX: &str = "open ";

/// Writes `open <url>` lines for the surrounding shell to act on.
#[derive(Debug)]
pub struct StdoutLauncher<W> {
    writer: W,
}

impl<W: Write> StdoutLauncher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EditorLauncher for StdoutLauncher<W> {
    fn open_editor(&mut self, url: &Url) -> Result<(), LaunchError> {
        writeln!(self.writer, "{OPEN_PREFIX}{url}")?;
        self.writer.flush()?;
        debug!(%url, "announced editor URL");
        Ok(())
    }
}
