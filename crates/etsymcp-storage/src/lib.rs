//! # Etsy Seller MCP Storage
//!
//! Keychain-backed implementation of the `SessionStore` trait.
//!
//! Uses the platform-native secure storage:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)

pub mod keychain;

pub use keychain::KeychainSessionStore;
