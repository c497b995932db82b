//! Decrypt a stored message body.

use anyhow::Result;
use veil_core::StrategyRegistry;

/// Decrypt `ciphertext` with the strategy for `mode_id`.
pub fn run(registry: &StrategyRegistry, mode_id: &str, ciphertext: &str) -> Result<String> {
    let strategy = registry.get_strategy(mode_id)?;
    Ok(strategy.decrypt(ciphertext)?)
}
