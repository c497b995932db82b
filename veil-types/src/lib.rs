//! # veil-types
//!
//! Shared types for the veilchat encryption-mode subsystem.
//!
//! This crate provides the foundational types used across all veilchat crates:
//! - [`EncryptionMode`] - The closed set of mode identifiers
//! - [`ModeMetadata`] - Discovery entry for a registered strategy
//! - [`StatusSnapshot`] - The status payload sent to clients and subscribers
//! - [`ModeError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod mode;
mod status;

pub use error::ModeError;
pub use mode::{EncryptionMode, ModeMetadata};
pub use status::StatusSnapshot;
