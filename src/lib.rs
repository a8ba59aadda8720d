//! # Twiniverse
//!
//! Client for the Twiniverse model-generation protocol:
//! - Username/password login
//! - Image and video uploads for server-side 3D model generation
//! - Fetching a generated model by content hash
//! - A stub server speaking the same framing, for testing
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ProtocolClient                          │
//! │     login / upload_images / upload_video / fetch_by_hash     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one call = one connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Connection (closed on drop)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Protocol codec                            │
//! │   [cmd (1)][len (4)][payload]  →  length-prefixed response   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ TCP
//!                       ▼
//!               Generation server
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod artifact;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TwinError, Result};
pub use config::{ClientConfig, ServerConfig};
pub use artifact::{ArtifactHandle, Clock, FixedClock, SystemClock};
pub use client::ProtocolClient;
pub use protocol::LoginResult;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Twiniverse
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
