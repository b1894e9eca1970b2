//! Token entity - one authenticated Etsy session
//!
//! Sessions are not refreshed: when `expires_at` passes, the record is treated
//! as absent and the user reconnects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access token and expiry for one authenticated session.
///
/// At most one record is active per process; it lives in the orchestrator's
/// session slot and, for persistence across restarts, in the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    /// Bearer access token (opaque secret)
    pub access_token: String,

    /// Token type (usually "Bearer")
    pub token_type: String,

    /// Absolute UTC expiry, computed from the provider's `expires_in`
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at,
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Derived connection state, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    /// Whether an unexpired token is held in memory
    pub connected: bool,

    /// Expiry of the active token, when connected
    pub expires_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            expires_at: None,
        }
    }
}
