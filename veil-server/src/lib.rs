//! # veil-server
//!
//! Encryption-mode service for veilchat.
//!
//! This crate owns the system-wide message encryption mode:
//! - Persists the current mode in a single SQLite record
//! - Encrypts and decrypts message bodies through the strategy registry
//! - Fans mode changes out to every connected client
//! - Serves a live status stream over server-sent events
//!
//! ## Architecture
//!
//! ```text
//!  PUT /api/encryption          GET /api/encryption/stream
//!           │                              ▲
//!           ▼                              │ SSE
//!   ┌───────────────────────────────────────────────┐
//!   │              EncryptionService                │
//!   │  ┌────────────┐ ┌──────────┐ ┌─────────────┐  │
//!   │  │ ModeStore  │ │ Registry │ │ ModeNotifier│  │
//!   │  │  (SQLite)  │ │          │ │             │  │
//!   │  └────────────┘ └──────────┘ └─────────────┘  │
//!   └───────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod notifier;
pub mod service;
pub mod storage;
