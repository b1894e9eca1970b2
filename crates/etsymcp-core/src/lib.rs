//! # Etsy Seller MCP Core Library
//!
//! Domain types and contracts shared by the auth, storage, and server crates.
//!
//! ## Modules
//!
//! - `config` - Environment-backed configuration (API key, redirect URI, timeouts)
//! - `domain` - Core entities (TokenRecord, ConnectionStatus)
//! - `error` - The authorization error taxonomy
//! - `repository` - Data access traits (SessionStore)

pub mod config;
pub mod domain;
pub mod error;
pub mod repository;

// Re-export commonly used types
pub use config::AuthConfig;
pub use domain::*;
pub use error::AuthError;
pub use repository::SessionStore;
