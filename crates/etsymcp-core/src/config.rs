//! Authentication configuration
//!
//! The API key comes from the environment (`ETSY_API_KEY`); everything else
//! has fixed Etsy defaults and is overridable mainly for tests.

use std::time::Duration;

use crate::error::AuthError;

/// Etsy authorization endpoint (browser-facing).
pub const ETSY_AUTHORIZE_URL: &str = "https://www.etsy.com/oauth/connect";

/// Etsy token endpoint (code-for-token exchange).
pub const ETSY_TOKEN_URL: &str = "https://api.etsy.com/v3/public/oauth/token";

/// Default local redirect target for the authorization callback.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8477/callback";

/// Default wait for the browser-driven authorization to complete.
pub const DEFAULT_AUTH_WAIT: Duration = Duration::from_secs(300);

/// Configuration for the OAuth flow and the authenticated API client.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Etsy API key (keystring), used as the OAuth client id
    pub api_key: String,
    /// OAuth redirect URI; must point at the local callback listener
    pub redirect_uri: String,
    /// Authorization endpoint the browser is sent to
    pub authorize_url: String,
    /// Token endpoint for the code exchange
    pub token_url: String,
    /// How long `connect` waits for the authorization callback
    pub auth_wait: Duration,
}

impl AuthConfig {
    /// Create a config with Etsy defaults for the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AuthError::Configuration(
                "ETSY_API_KEY is required. Set it as an environment variable.".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            authorize_url: ETSY_AUTHORIZE_URL.to_string(),
            token_url: ETSY_TOKEN_URL.to_string(),
            auth_wait: DEFAULT_AUTH_WAIT,
        })
    }

    /// Read the API key from `ETSY_API_KEY`.
    pub fn from_env() -> Result<Self, AuthError> {
        let api_key = std::env::var("ETSY_API_KEY").unwrap_or_default();
        Self::new(api_key)
    }

    /// Override the redirect URI (and with it, the callback listener address).
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Override the token endpoint (used by tests against a mock server).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Override the authorization wait timeout.
    pub fn with_auth_wait(mut self, auth_wait: Duration) -> Self {
        self.auth_wait = auth_wait;
        self
    }
}
