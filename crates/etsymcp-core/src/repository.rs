//! Repository traits for data access
//!
//! These traits define the interface for credential storage without specifying
//! the implementation (OS keychain, in-memory, etc.)

use async_trait::async_trait;

use crate::domain::TokenRecord;
use crate::error::AuthError;

/// Single-slot storage for the active session's token.
///
/// The store holds at most one record under a fixed service identifier and
/// overwrites unconditionally. Expiry is enforced lazily on `load`: a record
/// whose `expires_at` is at or before now is purged and reported as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the token, replacing any prior value.
    async fn save(&self, token: &TokenRecord) -> Result<(), AuthError>;

    /// Load the stored token, purging it first if it has expired.
    async fn load(&self) -> Result<Option<TokenRecord>, AuthError>;

    /// Remove the stored token. Not an error if nothing is stored.
    async fn delete(&self) -> Result<(), AuthError>;
}
