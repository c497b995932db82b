//! Error types for veilchat.

use thiserror::Error;

use crate::EncryptionMode;

/// Errors raised by mode lookup, mode changes and ciphertext decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    /// Strategy lookup for an identifier that is not registered
    #[error("unknown encryption mode: {0}")]
    UnknownMode(String),

    /// Mode change requested with an identifier outside the known set
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// Ciphertext could not be decoded under the given mode
    #[error("invalid ciphertext for {mode}: {reason}")]
    InvalidCiphertext {
        /// Mode the ciphertext was decoded with.
        mode: EncryptionMode,
        /// What was wrong with the input.
        reason: String,
    },
}

impl ModeError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ModeError::UnknownMode(_) => "unknown_mode",
            ModeError::UnsupportedMode(_) => "unsupported_mode",
            ModeError::InvalidCiphertext { .. } => "invalid_ciphertext",
        }
    }
}
