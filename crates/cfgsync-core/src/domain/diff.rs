//! Delta computation between two configurations.

use super::config::{Configuration, Delta};

/// Computes the settings that must be sent to the device.
///
/// With no valid `previous` configuration the delta is the whole of `next`.
/// Otherwise it holds every key of `next` whose value differs from the value
/// in `previous` (a key missing from `previous` counts as changed).  Keys that
/// only exist in `previous` are never included: the key set is fixed per
/// schema version.
pub fn compute_delta(previous: Option<&Configuration>, next: &Configuration) -> Delta {
    match previous {
        None => Delta::full(next),
        Some(previous) => next
            .iter()
            .filter(|(key, value)| previous.get(key) != Some(*value))
            .collect(),
    }
}
