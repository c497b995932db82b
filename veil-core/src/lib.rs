//! # veil-core
//!
//! Pure logic for veilchat encryption modes (no I/O, instant tests).
//!
//! This crate implements the message transforms and the registry that
//! selects between them, without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! Strategies are stateless values behind the [`EncryptionStrategy`]
//! trait. The [`StrategyRegistry`] is built once at startup and handed to
//! whoever needs it by reference; there is no global table.
//!
//! Persistence of the current mode and change notification live in
//! `veil-server`, which drives these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod registry;
pub mod strategy;

pub use registry::StrategyRegistry;
pub use strategy::{
    xor_with_key, Base64XorStrategy, EncryptionStrategy, HexXorStrategy, PlaintextStrategy,
    WEAK_XOR_BASE64_KEY, WEAK_XOR_HEX_KEY,
};
