//! Strategy registry.
//!
//! Maps mode identifiers to strategies. The table is fixed when the
//! registry is built; listing order is registration order.
//!
//! Modes that are known but have no strategy of their own resolve to the
//! plaintext strategy instead of failing.

use crate::strategy::{Base64XorStrategy, EncryptionStrategy, HexXorStrategy, PlaintextStrategy};
use veil_types::{EncryptionMode, ModeError, ModeMetadata};

/// Fixed table of encryption strategies.
pub struct StrategyRegistry {
    /// Registered strategies, in registration order.
    strategies: Vec<Box<dyn EncryptionStrategy>>,
    /// Used for every mode without its own entry.
    fallback: PlaintextStrategy,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<EncryptionMode> = self.strategies.iter().map(|s| s.id()).collect();
        f.debug_struct("StrategyRegistry")
            .field("strategies", &ids)
            .finish()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    /// Build the registry with every implemented strategy.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(PlaintextStrategy),
                Box::new(HexXorStrategy),
                Box::new(Base64XorStrategy),
            ],
            fallback: PlaintextStrategy,
        }
    }

    /// Look up a strategy by wire identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ModeError::UnknownMode`] if `mode_id` is not a known mode.
    pub fn get_strategy(&self, mode_id: &str) -> Result<&dyn EncryptionStrategy, ModeError> {
        let mode: EncryptionMode = mode_id.parse()?;
        Ok(self.strategy_for(mode))
    }

    /// Look up a strategy by mode, falling back to plaintext.
    pub fn strategy_for(&self, mode: EncryptionMode) -> &dyn EncryptionStrategy {
        self.registered(mode).unwrap_or(&self.fallback)
    }

    /// Whether `mode` has a strategy of its own.
    pub fn is_implemented(&self, mode: EncryptionMode) -> bool {
        self.registered(mode).is_some()
    }

    /// Discovery listing, in registration order.
    ///
    /// The returned vector is an owned snapshot.
    pub fn list_modes(&self) -> Vec<ModeMetadata> {
        self.strategies
            .iter()
            .map(|s| ModeMetadata {
                id: s.id(),
                label: s.label().to_string(),
                description: Some(s.description().to_string()),
            })
            .collect()
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    fn registered(&self, mode: EncryptionMode) -> Option<&dyn EncryptionStrategy> {
        self.strategies
            .iter()
            .find(|s| s.id() == mode)
            .map(|s| &**s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let registry = StrategyRegistry::new();
        assert_eq!(
            registry.get_strategy("weak_xor").unwrap().id(),
            EncryptionMode::WeakXor
        );
        assert_eq!(
            registry.get_strategy("weak_xor_b64").unwrap().id(),
            EncryptionMode::WeakXorBase64
        );
    }

    #[test]
    fn unknown_id_fails() {
        let registry = StrategyRegistry::new();
        let err = registry.get_strategy("rot13").err().unwrap();
        assert_eq!(err, ModeError::UnknownMode("rot13".into()));
    }

    #[test]
    fn reserved_modes_fall_back_to_plaintext() {
        let registry = StrategyRegistry::new();
        for id in ["end_to_end", "end_to_end_stego"] {
            let strategy = registry.get_strategy(id).unwrap();
            assert_eq!(strategy.id(), EncryptionMode::Plaintext);
            assert_eq!(strategy.encrypt("secret"), "secret");
        }
        assert!(!registry.is_implemented(EncryptionMode::EndToEnd));
        assert!(registry.is_implemented(EncryptionMode::WeakXor));
    }

    #[test]
    fn every_known_mode_round_trips() {
        let registry = StrategyRegistry::new();
        for mode in EncryptionMode::ALL {
            let strategy = registry.get_strategy(mode.as_str()).unwrap();
            let text = "round trip ✓";
            assert_eq!(strategy.decrypt(&strategy.encrypt(text)).unwrap(), text);
        }
    }

    #[test]
    fn list_is_in_registration_order() {
        let registry = StrategyRegistry::new();
        let ids: Vec<EncryptionMode> = registry.list_modes().iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                EncryptionMode::Plaintext,
                EncryptionMode::WeakXor,
                EncryptionMode::WeakXorBase64
            ]
        );
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }

    #[test]
    fn list_carries_labels_and_descriptions() {
        let registry = StrategyRegistry::new();
        let modes = registry.list_modes();
        assert_eq!(modes[0].label, "Plain Text");
        assert_eq!(modes[1].label, "Weak XOR Cipher");
        assert!(modes.iter().all(|m| m.description.is_some()));
    }

    #[test]
    fn registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StrategyRegistry>();
    }
}
