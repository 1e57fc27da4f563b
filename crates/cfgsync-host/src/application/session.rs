//! ConfigSession: reacts to the host's configuration events.
//!
//! The host raises three events for the settings page:
//!
//! ```text
//! ready               ──►  nothing to do yet
//! show_configuration  ──►  open the editor, pre-filled with the last save
//! editor_closed(resp) ──►  decode → diff + persist → send delta to the device
//! ```
//!
//! The session depends only on traits (`KeyValueStore`, `MessageChannel`,
//! `EditorLauncher`).  Infrastructure implementations are injected at
//! construction time, so every path is testable with in-memory doubles.

use std::collections::BTreeMap;

use cfgsync_core::{decode_editor_response, editor_url, Delta, SettingsSchema};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use super::config_cache::{ConfigCache, KeyValueStore};

/// Error returned by a [`MessageChannel`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The host refused the message (e.g. no device connected).
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Error returned by an [`EditorLauncher`].
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launcher I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("editor launch rejected: {0}")]
    Rejected(String),
}

/// The host's "send structured message to device" primitive.
#[cfg_attr(test, mockall::automock)]
pub trait MessageChannel {
    /// Sends one flat string-keyed message to the device.
    fn send_structured(&mut self, message: &BTreeMap<String, String>) -> Result<(), ChannelError>;
}

/// The host's "open URL" primitive, used to show the editor.
#[cfg_attr(test, mockall::automock)]
pub trait EditorLauncher {
    fn open_editor(&mut self, url: &Url) -> Result<(), LaunchError>;
}

/// What happened to one editor response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The response was malformed or empty; nothing was persisted or sent.
    Rejected,
    /// The snapshot was rewritten but no setting changed; nothing was sent.
    Unchanged,
    /// The delta was persisted and handed to the message channel.
    Sent(Delta),
    /// The delta was persisted but the message channel refused it.
    SendFailed(Delta),
}

/// One settings page's worth of host event handling.
pub struct ConfigSession<S, C, L> {
    cache: ConfigCache<S>,
    channel: C,
    launcher: L,
    editor_base: Url,
    schema: Option<SettingsSchema>,
}

impl<S, C, L> ConfigSession<S, C, L>
where
    S: KeyValueStore,
    C: MessageChannel,
    L: EditorLauncher,
{
    pub fn new(cache: ConfigCache<S>, channel: C, launcher: L, editor_base: Url) -> Self {
        Self {
            cache,
            channel,
            launcher,
            editor_base,
            schema: None,
        }
    }

    /// Attaches the settings schema used to flag undeclared keys.
    pub fn with_schema(mut self, schema: SettingsSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn cache(&self) -> &ConfigCache<S> {
        &self.cache
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Splits the session back into its cache and host primitives.
    pub fn into_parts(self) -> (ConfigCache<S>, C, L) {
        (self.cache, self.channel, self.launcher)
    }

    /// Handles the host's ready event.
    pub fn ready(&self) {
        debug!(version = %self.cache.schema_version(), "configuration session ready");
    }

    /// Opens the editor, pre-filled with the last valid saved configuration.
    ///
    /// Returns the URL that was opened.
    ///
    /// # Errors
    ///
    /// Returns the launcher's error if the editor could not be opened.
    pub fn show_configuration(&mut self) -> Result<Url, LaunchError> {
        let prefill = self.cache.load_prefill_reference();
        let url = match editor_url(&self.editor_base, prefill.as_ref()) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not encode prefill; opening editor without it");
                self.editor_base.clone()
            }
        };

        info!(prefilled = prefill.is_some(), "opening configuration editor");
        self.launcher.open_editor(&url)?;
        Ok(url)
    }

    /// Handles the editor closing with `response`.
    ///
    /// Never fails: a malformed response is dropped and a channel failure is
    /// logged, both reported through the returned [`SaveOutcome`].
    pub fn editor_closed(&mut self, response: &str) -> SaveOutcome {
        let config = match decode_editor_response(response) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "dropping editor response");
                return SaveOutcome::Rejected;
            }
        };

        if let Some(schema) = &self.schema {
            let unknown = schema.unknown_keys(&config);
            if !unknown.is_empty() {
                warn!(keys = ?unknown, "editor sent settings the schema does not declare");
            }
        }

        let delta = self.cache.compute_and_persist(&config);
        if delta.is_empty() {
            info!("configuration unchanged; nothing to send");
            return SaveOutcome::Unchanged;
        }

        match self.channel.send_structured(delta.as_map()) {
            Ok(()) => {
                info!(changed = delta.len(), "sent configuration delta");
                SaveOutcome::Sent(delta)
            }
            Err(e) => {
                error!(error = %e, changed = delta.len(), "failed to send configuration delta");
                SaveOutcome::SendFailed(delta)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemoryKeyValueStore;
    use cfgsync_core::{parse_snapshot, SchemaVersion, SNAPSHOT_KEY};
    use mockall::predicate;

    const EDITOR: &str = "http://example.net/config.htm";

    fn editor_base() -> Url {
        Url::parse(EDITOR).unwrap()
    }

    fn session_with(
        store: MemoryKeyValueStore,
        channel: MockMessageChannel,
        launcher: MockEditorLauncher,
    ) -> ConfigSession<MemoryKeyValueStore, MockMessageChannel, MockEditorLauncher> {
        let cache = ConfigCache::new(store, SchemaVersion(4));
        ConfigSession::new(cache, channel, launcher, editor_base())
    }

    fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ── editor_closed ─────────────────────────────────────────────────────────

    #[test]
    fn test_first_close_sends_full_configuration() {
        // Arrange
        let mut channel = MockMessageChannel::new();
        channel
            .expect_send_structured()
            .with(predicate::eq(expected(&[("a", "1"), ("b", "on")])))
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new());

        // Act
        let outcome = session.editor_closed(r#"{"a":"1","b":"on"}"#);

        // Assert
        assert!(matches!(outcome, SaveOutcome::Sent(ref d) if d.len() == 2));
    }

    #[test]
    fn test_second_close_sends_only_changed_key() {
        // Arrange
        let mut channel = MockMessageChannel::new();
        let mut seq = mockall::Sequence::new();
        channel
            .expect_send_structured()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        channel
            .expect_send_structured()
            .with(predicate::eq(expected(&[("b", "off")])))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new());

        // Act
        session.editor_closed(r#"{"a":"1","b":"on"}"#);
        let outcome = session.editor_closed(r#"{"a":"1","b":"off"}"#);

        // Assert
        let delta: Delta = [("b", "off")].into_iter().collect();
        assert_eq!(outcome, SaveOutcome::Sent(delta));
    }

    #[test]
    fn test_unchanged_resave_sends_nothing() {
        let mut channel = MockMessageChannel::new();
        channel.expect_send_structured().times(1).returning(|_| Ok(()));
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new());

        session.editor_closed(r#"{"a":"1"}"#);
        let outcome = session.editor_closed(r#"{"a":"1"}"#);

        assert_eq!(outcome, SaveOutcome::Unchanged);
    }

    #[test]
    fn test_malformed_response_neither_persists_nor_sends() {
        // Arrange: no expectations → any send would panic the mock
        let channel = MockMessageChannel::new();
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new());

        // Act
        let short = session.editor_closed("{}");
        let garbage = session.editor_closed("not-json");
        let broken = session.editor_closed("{ definitely not json }");

        // Assert
        assert_eq!(short, SaveOutcome::Rejected);
        assert_eq!(garbage, SaveOutcome::Rejected);
        assert_eq!(broken, SaveOutcome::Rejected);
        assert_eq!(session.cache().store().writes, 0);
    }

    #[test]
    fn test_channel_failure_is_reported_but_snapshot_kept() {
        // Arrange
        let mut channel = MockMessageChannel::new();
        channel
            .expect_send_structured()
            .returning(|_| Err(ChannelError::Rejected("no device".into())));
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new());

        // Act
        let outcome = session.editor_closed(r#"{"a":"1"}"#);

        // Assert
        assert!(matches!(outcome, SaveOutcome::SendFailed(_)));
        let raw = session.cache().store().raw(SNAPSHOT_KEY).expect("persisted");
        assert_eq!(parse_snapshot(raw).unwrap().config.get("a"), Some("1"));
    }

    #[test]
    fn test_unknown_keys_are_still_forwarded() {
        // Arrange
        let schema = SettingsSchema::from_toml_str(
            "version = 4\n[[sections]]\ntitle = \"Main\"\n[[sections.entries]]\nkey = \"a\"\nlabel = \"A\"\nkind = \"checkbox\"\n",
        )
        .unwrap();
        let mut channel = MockMessageChannel::new();
        channel
            .expect_send_structured()
            .with(predicate::eq(expected(&[("a", "1"), ("extra", "x")])))
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(MemoryKeyValueStore::new(), channel, MockEditorLauncher::new())
            .with_schema(schema);

        // Act
        let outcome = session.editor_closed(r#"{"a":"1","extra":"x"}"#);

        // Assert
        assert!(matches!(outcome, SaveOutcome::Sent(_)));
    }

    // ── show_configuration ────────────────────────────────────────────────────

    #[test]
    fn test_show_configuration_without_snapshot_opens_bare_url() {
        // Arrange
        let mut launcher = MockEditorLauncher::new();
        launcher
            .expect_open_editor()
            .withf(|url| url.as_str() == EDITOR)
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(MemoryKeyValueStore::new(), MockMessageChannel::new(), launcher);

        // Act
        let url = session.show_configuration().expect("launch succeeds");

        // Assert
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_show_configuration_prefills_last_save() {
        // Arrange
        let store = MemoryKeyValueStore::new()
            .with_entry(SNAPSHOT_KEY, r#"{"version":4,"config":"{\"a\":\"1\"}"}"#);
        let mut launcher = MockEditorLauncher::new();
        launcher
            .expect_open_editor()
            .withf(|url| url.query() == Some("%7B%22a%22%3A%221%22%7D"))
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(store, MockMessageChannel::new(), launcher);

        // Act / Assert
        assert!(session.show_configuration().is_ok());
    }

    #[test]
    fn test_show_configuration_ignores_outdated_snapshot() {
        let store = MemoryKeyValueStore::new()
            .with_entry(SNAPSHOT_KEY, r#"{"version":3,"config":"{\"a\":\"1\"}"}"#);
        let mut launcher = MockEditorLauncher::new();
        launcher
            .expect_open_editor()
            .withf(|url| url.query().is_none())
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(store, MockMessageChannel::new(), launcher);

        assert!(session.show_configuration().is_ok());
    }

    #[test]
    fn test_show_configuration_propagates_launch_failure() {
        let mut launcher = MockEditorLauncher::new();
        launcher
            .expect_open_editor()
            .returning(|_| Err(LaunchError::Rejected("no browser".into())));
        let mut session = session_with(MemoryKeyValueStore::new(), MockMessageChannel::new(), launcher);

        let result = session.show_configuration();

        assert!(matches!(result, Err(LaunchError::Rejected(_))));
    }

    #[test]
    fn test_ready_has_no_side_effects() {
        let session = session_with(
            MemoryKeyValueStore::new(),
            MockMessageChannel::new(),
            MockEditorLauncher::new(),
        );
        session.ready();
        assert_eq!(session.cache().store().writes, 0);
    }
}
