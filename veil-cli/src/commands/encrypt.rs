//! Encrypt a message body.

use anyhow::{Context, Result};
use veil_core::StrategyRegistry;
use veil_types::EncryptionMode;

/// Encrypt `text` under `mode_id`.
///
/// Reserved modes without their own strategy encrypt as plaintext, the same
/// as the server does.
pub fn run(registry: &StrategyRegistry, mode_id: &str, text: &str) -> Result<String> {
    let mode: EncryptionMode = mode_id
        .parse()
        .with_context(|| format!("cannot encrypt under '{mode_id}'"))?;

    let strategy = registry.strategy_for(mode);
    if strategy.id() != mode {
        eprintln!("note: {mode} has no strategy yet, using {}", strategy.id());
    }

    Ok(strategy.encrypt(text))
}
