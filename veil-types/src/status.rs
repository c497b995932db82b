//! Status payload shared by the status endpoint and the change stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EncryptionMode, ModeMetadata};

/// Snapshot of the current mode.
///
/// Sent once when a stream opens and again after every actual change.
/// Snapshots are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current mode
    pub mode: EncryptionMode,
    /// Label of the current mode
    pub label: String,
    /// When the mode record was last written
    pub updated_at: DateTime<Utc>,
    /// Modes a client can pick from, in registry order
    pub available_modes: Vec<ModeMetadata>,
}

impl StatusSnapshot {
    /// Build a snapshot from the stored record and the registry listing.
    pub fn new(
        mode: EncryptionMode,
        updated_at: DateTime<Utc>,
        available_modes: Vec<ModeMetadata>,
    ) -> Self {
        Self {
            mode,
            label: mode.label().to_string(),
            updated_at,
            available_modes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> StatusSnapshot {
        StatusSnapshot::new(
            EncryptionMode::WeakXor,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            vec![ModeMetadata {
                id: EncryptionMode::Plaintext,
                label: "Plain Text".into(),
                description: None,
            }],
        )
    }

    #[test]
    fn label_follows_mode() {
        assert_eq!(sample().label, "Weak XOR Cipher");
    }

    #[test]
    fn json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["mode"], "weak_xor");
        assert_eq!(value["updated_at"], "2026-03-01T12:00:00Z");
        assert_eq!(value["available_modes"][0]["id"], "plaintext");
        assert!(value["available_modes"][0]["description"].is_null());
    }

    #[test]
    fn json_is_single_line() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains('\n'));

        let decoded: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, sample());
    }
}
