//! Identity Verifier
//!
//! Final gate of every fetch: the materialized plugin's id (and version,
//! when the expectation carries `@version`) must match what the caller
//! asked for.

use std::path::Path;

use crate::error::{PlugwrightError, Result};
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::reference::split_id_version;

/// Check the descriptor at `dir` against `expected_id` (`id` or
/// `id@version`). No-op when nothing is expected.
pub fn verify(expected_id: Option<&str>, dir: &Path) -> Result<()> {
    let Some(expected) = expected_id else {
        return Ok(());
    };

    let descriptor = PluginDescriptor::load(dir)?;
    let actual = match split_id_version(expected) {
        (_, Some(_)) => descriptor.identity(),
        (_, None) => descriptor.id.clone(),
    };

    if actual != expected {
        return Err(PlugwrightError::IdentityMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}
