//! Storage layer for veil-server.
//!
//! Persists the single "current mode" record.

mod sqlite;

pub use sqlite::SqliteModeStore;

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use veil_types::EncryptionMode;

/// The persisted current mode.
///
/// Exactly one logical record exists. It is created on first access with
/// [`EncryptionMode::Plaintext`] and is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRecord {
    /// Current mode.
    pub mode: EncryptionMode,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Trait for mode storage backends.
#[async_trait]
pub trait ModeStore: Send + Sync {
    /// Read the current record, creating the default one if none exists.
    async fn get_mode(&self) -> Result<ModeRecord, StorageError>;

    /// Write `mode` if it differs from the stored one.
    ///
    /// The compare and the write happen atomically. Returns the record as
    /// stored afterwards and whether it changed. A no-op leaves
    /// `updated_at` untouched.
    async fn set_mode(&self, mode: EncryptionMode) -> Result<(ModeRecord, bool), StorageError>;
}
