//! Message body transforms.
//!
//! This module provides the [`EncryptionStrategy`] capability and its
//! implementations:
//! - [`PlaintextStrategy`] - identity, and the fallback for reserved modes
//! - [`HexXorStrategy`] - repeating-key XOR, lowercase hex output
//! - [`Base64XorStrategy`] - repeating-key XOR, standard base64 output
//!
//! The XOR variants are obfuscation for demos. They offer no secrecy.

use base64::{engine::general_purpose::STANDARD, Engine};
use veil_types::{EncryptionMode, ModeError};

/// Static key of the hex XOR variant.
pub const WEAK_XOR_HEX_KEY: &[u8] = b"weak-demo-key";

/// Static key of the base64 XOR variant.
pub const WEAK_XOR_BASE64_KEY: &[u8] = b"stego-key";

/// An encrypt/decrypt pair implementing one mode.
///
/// Implementations are stateless and shared across concurrent callers.
pub trait EncryptionStrategy: Send + Sync {
    /// Mode this strategy implements.
    fn id(&self) -> EncryptionMode;

    /// Display label.
    fn label(&self) -> &'static str {
        self.id().label()
    }

    /// Short explanation for discovery listings.
    fn description(&self) -> &'static str;

    /// Transform a message body for storage or transmission.
    fn encrypt(&self, plaintext: &str) -> String;

    /// Invert [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`ModeError::InvalidCiphertext`] when the input is not a
    /// valid encoding for this strategy or does not decode to UTF-8.
    fn decrypt(&self, ciphertext: &str) -> Result<String, ModeError>;
}

/// Repeating-key XOR: `out[i] = data[i] ^ key[i % key.len()]`.
///
/// Applying it twice with the same key returns the input.
pub fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

fn invalid(mode: EncryptionMode, reason: impl Into<String>) -> ModeError {
    ModeError::InvalidCiphertext {
        mode,
        reason: reason.into(),
    }
}

fn utf8(mode: EncryptionMode, bytes: Vec<u8>) -> Result<String, ModeError> {
    String::from_utf8(bytes).map_err(|e| invalid(mode, format!("not UTF-8 after decoding: {e}")))
}

/// Identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextStrategy;

impl EncryptionStrategy for PlaintextStrategy {
    fn id(&self) -> EncryptionMode {
        EncryptionMode::Plaintext
    }

    fn description(&self) -> &'static str {
        "Messages are stored and sent exactly as written."
    }

    fn encrypt(&self, plaintext: &str) -> String {
        plaintext.to_string()
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, ModeError> {
        Ok(ciphertext.to_string())
    }
}

/// XOR with [`WEAK_XOR_HEX_KEY`], two lowercase hex digits per byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexXorStrategy;

impl EncryptionStrategy for HexXorStrategy {
    fn id(&self) -> EncryptionMode {
        EncryptionMode::WeakXor
    }

    fn description(&self) -> &'static str {
        "Bytes XORed with a static key, hex encoded. Obfuscation only."
    }

    fn encrypt(&self, plaintext: &str) -> String {
        hex::encode(xor_with_key(plaintext.as_bytes(), WEAK_XOR_HEX_KEY))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, ModeError> {
        let mode = self.id();
        // encrypt() emits lowercase only
        if ciphertext.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid(mode, "hex digits must be lowercase"));
        }
        let raw = hex::decode(ciphertext).map_err(|e| invalid(mode, e.to_string()))?;
        utf8(mode, xor_with_key(&raw, WEAK_XOR_HEX_KEY))
    }
}

/// XOR with [`WEAK_XOR_BASE64_KEY`], standard padded base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64XorStrategy;

impl EncryptionStrategy for Base64XorStrategy {
    fn id(&self) -> EncryptionMode {
        EncryptionMode::WeakXorBase64
    }

    fn description(&self) -> &'static str {
        "Bytes XORed with a static key, base64 encoded. Obfuscation only."
    }

    fn encrypt(&self, plaintext: &str) -> String {
        STANDARD.encode(xor_with_key(plaintext.as_bytes(), WEAK_XOR_BASE64_KEY))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, ModeError> {
        let mode = self.id();
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| invalid(mode, e.to_string()))?;
        utf8(mode, xor_with_key(&raw, WEAK_XOR_BASE64_KEY))
    }
}
