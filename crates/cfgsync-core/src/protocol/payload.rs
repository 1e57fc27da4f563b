//! Editor response decoding and editor URL encoding.
//!
//! The editor closes by navigating to a close URL whose fragment is
//! `encodeURIComponent(JSON.stringify(settings))`; the host hands that
//! fragment over as the response string.  A cancelled or broken edit session
//! yields an empty or partial response, so the response first has to pass a
//! cheap structural check before anything is decoded.
//!
//! In the other direction, the editor is opened with the last saved settings
//! appended as its query string so it can pre-fill the form.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

use crate::domain::config::Configuration;

/// Shortest response that can hold a non-empty settings object.
pub const MIN_RESPONSE_LEN: usize = 6;

/// Characters `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Reasons an editor response is dropped.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The raw response does not look like a JSON object.
    #[error("response failed the structural check (len={len})")]
    Malformed { len: usize },

    /// Percent-decoding produced invalid UTF-8.
    #[error("response is not valid UTF-8 after percent-decoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The decoded text is not a flat JSON object of scalar settings.
    #[error("response is not a flat JSON settings object: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings object holds no settings.
    #[error("response holds no settings")]
    Empty,
}

/// The structural heuristic applied to the raw response.
///
/// Accepts strings that start with `{`, end with `}` and are at least
/// [`MIN_RESPONSE_LEN`] characters long.  Nothing else is validated.
pub fn passes_structural_check(response: &str) -> bool {
    response.starts_with('{')
        && response.ends_with('}')
        && response.chars().count() >= MIN_RESPONSE_LEN
}

/// Decodes an editor response into a [`Configuration`].
///
/// The structural check runs on the raw response; the response is then
/// percent-decoded (a no-op for a response the host already decoded) and
/// parsed as JSON.
///
/// # Errors
///
/// Returns a [`PayloadError`] describing why the response was dropped.
pub fn decode_editor_response(response: &str) -> Result<Configuration, PayloadError> {
    if !passes_structural_check(response) {
        return Err(PayloadError::Malformed {
            len: response.len(),
        });
    }

    let decoded = percent_decode_str(response).decode_utf8()?;
    let config: Configuration = serde_json::from_str(&decoded)?;
    if config.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(config)
}

/// Percent-encodes `text` the way `encodeURIComponent` does.
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Builds the URL that opens the editor.
///
/// With a `prefill` configuration the query string is replaced by the
/// URI-component-encoded JSON of that configuration; without one any query on
/// `base` is dropped, since the editor reads its whole query as settings.
///
/// `Url` serializes http(s) queries with the WHATWG special-query set, which
/// also escapes `'` as `%27`.  The query therefore differs from
/// [`encode_uri_component`] for values holding an apostrophe, but it
/// percent-decodes to the same JSON.
///
/// # Errors
///
/// Propagates the (practically impossible) JSON serialization error.
pub fn editor_url(base: &Url, prefill: Option<&Configuration>) -> Result<Url, serde_json::Error> {
    let query = prefill
        .map(|config| config.to_json().map(|json| encode_uri_component(&json)))
        .transpose()?;

    let mut url = base.clone();
    url.set_query(query.as_deref());
    Ok(url)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
