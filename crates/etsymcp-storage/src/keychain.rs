//! OS keychain session storage.
//!
//! Stores two entries under one service namespace: the access token itself and
//! a small metadata blob with the expiry timestamp. Both must be present for a
//! load to succeed; an expired record is purged on load (lazy expiry, there is
//! no background sweep).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use etsymcp_core::{AuthError, SessionStore, TokenRecord};

/// Service namespace in the platform secret store.
pub const KEYRING_SERVICE: &str = "etsy-seller-mcp";

/// Entry name for the access token secret.
const TOKEN_KEY: &str = "access_token";

/// Entry name for the metadata blob.
const METADATA_KEY: &str = "token_metadata";

/// Metadata persisted alongside the secret.
#[derive(Debug, Serialize, Deserialize)]
struct TokenMetadata {
    /// ISO-8601 UTC expiry timestamp
    expires_at: DateTime<Utc>,
}

/// Keychain-backed single-slot token store.
pub struct KeychainSessionStore {
    token_entry: Entry,
    metadata_entry: Entry,
}

impl KeychainSessionStore {
    /// Create a store under the default service namespace.
    pub fn new() -> Result<Self, AuthError> {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Create a store under a custom service namespace (used by tests to
    /// isolate entries).
    pub fn with_service(service: &str) -> Result<Self, AuthError> {
        let token_entry = Entry::new(service, TOKEN_KEY)
            .map_err(|e| AuthError::StorageUnavailable(format!("keychain entry: {e}")))?;
        let metadata_entry = Entry::new(service, METADATA_KEY)
            .map_err(|e| AuthError::StorageUnavailable(format!("keychain entry: {e}")))?;

        Ok(Self {
            token_entry,
            metadata_entry,
        })
    }

    fn read_entry(entry: &Entry) -> Result<Option<Zeroizing<String>>, AuthError> {
        match entry.get_password() {
            Ok(value) => Ok(Some(Zeroizing::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::StorageUnavailable(e.to_string())),
        }
    }

    fn delete_entry(entry: &Entry) -> Result<(), AuthError> {
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::StorageUnavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl SessionStore for KeychainSessionStore {
    async fn save(&self, token: &TokenRecord) -> Result<(), AuthError> {
        self.token_entry
            .set_password(&token.access_token)
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        let metadata = serde_json::to_string(&TokenMetadata {
            expires_at: token.expires_at,
        })
        .map_err(|e| AuthError::StorageUnavailable(format!("metadata encode: {e}")))?;

        self.metadata_entry
            .set_password(&metadata)
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        info!("Token saved to system keyring");
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        let Some(access_token) = Self::read_entry(&self.token_entry)? else {
            debug!("No token in keyring");
            return Ok(None);
        };

        let Some(metadata_json) = Self::read_entry(&self.metadata_entry)? else {
            debug!("Token present but metadata missing; treating as absent");
            return Ok(None);
        };

        let metadata: TokenMetadata = serde_json::from_str(&metadata_json)
            .map_err(|e| AuthError::StorageUnavailable(format!("metadata decode: {e}")))?;

        if Utc::now() >= metadata.expires_at {
            warn!("Stored token has expired; purging. Please reconnect.");
            self.delete().await?;
            return Ok(None);
        }

        Ok(Some(TokenRecord::new(
            access_token.to_string(),
            "Bearer",
            metadata.expires_at,
        )))
    }

    async fn delete(&self) -> Result<(), AuthError> {
        Self::delete_entry(&self.token_entry)?;
        Self::delete_entry(&self.metadata_entry)?;
        debug!("Token entries cleared from keyring");
        Ok(())
    }
}
