//! `MessageChannel` that writes each device message as one JSON line.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::trace;

use crate::application::session::{ChannelError, MessageChannel};

/// Writes every structured message as a single-line JSON object followed by
/// `\n`, flushing after each message.
#[derive(Debug)]
pub struct JsonLinesChannel<W> {
    writer: W,
    sent: usize,
}

impl<W: Write> JsonLinesChannel<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, sent: 0 }
    }

    /// Number of messages written so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageChannel for JsonLinesChannel<W> {
    fn send_structured(&mut self, message: &BTreeMap<String, String>) -> Result<(), ChannelError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.sent += 1;
        trace!(keys = message.len(), "wrote device message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// A writer that refuses every write.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_writes_one_json_line_per_message() {
        // Arrange
        let mut channel = JsonLinesChannel::new(Vec::new());

        // Act
        channel.send_structured(&message(&[("b", "off")])).unwrap();
        channel
            .send_structured(&message(&[("a", "1"), ("c", "x y")]))
            .unwrap();

        // Assert
        assert_eq!(channel.sent(), 2);
        let output = String::from_utf8(channel.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![r#"{"b":"off"}"#, r#"{"a":"1","c":"x y"}"#]);
    }

    #[test]
    fn test_send_escapes_control_characters_onto_one_line() {
        let mut channel = JsonLinesChannel::new(Vec::new());

        channel
            .send_structured(&message(&[("note", "line1\nline2")]))
            .unwrap();

        let output = String::from_utf8(channel.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains(r"line1\nline2"));
    }

    #[test]
    fn test_send_reports_io_failure() {
        let mut channel = JsonLinesChannel::new(BrokenPipe);

        let result = channel.send_structured(&message(&[("a", "1")]));

        assert!(result.is_err());
        assert_eq!(channel.sent(), 0);
    }
}
