//! Encryption mode identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModeError;

/// The currently active message transform.
///
/// The set is closed: anything that does not parse into one of these
/// variants is rejected. Reserved modes (`end_to_end`, `end_to_end_stego`)
/// are valid identifiers without their own transform yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    /// Bodies are stored as written.
    #[default]
    Plaintext,
    /// XOR with a static key, lowercase hex output.
    WeakXor,
    /// XOR with a static key, standard base64 output.
    #[serde(rename = "weak_xor_b64")]
    WeakXorBase64,
    /// Reserved.
    EndToEnd,
    /// Reserved.
    EndToEndStego,
}

impl EncryptionMode {
    /// Every known mode, in declaration order.
    pub const ALL: [EncryptionMode; 5] = [
        EncryptionMode::Plaintext,
        EncryptionMode::WeakXor,
        EncryptionMode::WeakXorBase64,
        EncryptionMode::EndToEnd,
        EncryptionMode::EndToEndStego,
    ];

    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMode::Plaintext => "plaintext",
            EncryptionMode::WeakXor => "weak_xor",
            EncryptionMode::WeakXorBase64 => "weak_xor_b64",
            EncryptionMode::EndToEnd => "end_to_end",
            EncryptionMode::EndToEndStego => "end_to_end_stego",
        }
    }

    /// Human-readable label shown to clients.
    pub fn label(&self) -> &'static str {
        match self {
            EncryptionMode::Plaintext => "Plain Text",
            EncryptionMode::WeakXor => "Weak XOR Cipher",
            EncryptionMode::WeakXorBase64 => "Weak XOR Cipher (Base64)",
            EncryptionMode::EndToEnd => "End-to-End Encrypted",
            EncryptionMode::EndToEndStego => "End-to-End Encrypted + Steganography",
        }
    }

    /// Parse a mode id received from a client that wants to change the mode.
    ///
    /// Same as [`FromStr`] but reports `UnsupportedMode`.
    pub fn parse_supported(id: &str) -> Result<Self, ModeError> {
        id.parse()
            .map_err(|_| ModeError::UnsupportedMode(id.to_string()))
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EncryptionMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ModeError::UnknownMode(s.to_string()))
    }
}

/// Discovery entry for one registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeMetadata {
    /// Mode identifier
    pub id: EncryptionMode,
    /// Display label
    pub label: String,
    /// Short explanation of what the transform does
    pub description: Option<String>,
}
