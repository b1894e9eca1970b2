//! Authorization code exchange
//!
//! One form-encoded POST to the token endpoint, normalizing the provider's
//! relative `expires_in` into an absolute UTC expiry so no downstream consumer
//! re-derives it. Codes are single-use upstream, so a failed exchange is never
//! retried.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::info;

use etsymcp_core::{AuthConfig, AuthError, TokenRecord};

/// Seconds a token lives when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Client-level timeout for the token request; independent of the
/// authorization wait.
const EXCHANGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Seam for the code-for-token exchange, so the orchestrator can be driven
/// with a test double.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization code (plus its PKCE verifier) for a token.
    async fn exchange_code(&self, code: &str, code_verifier: &str)
        -> Result<TokenRecord, AuthError>;
}

/// Token response from the OAuth server
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

/// Real exchanger against Etsy's token endpoint.
pub struct EtsyTokenExchanger {
    http_client: reqwest::Client,
    token_url: String,
    api_key: String,
    redirect_uri: String,
}

impl EtsyTokenExchanger {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_url: config.token_url.clone(),
            api_key: config.api_key.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }
}

#[async_trait]
impl TokenExchanger for EtsyTokenExchanger {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenRecord, AuthError> {
        info!("Exchanging authorization code for access token");

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.api_key.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ExchangeFailed { status, body });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let access_token = token_response
            .access_token
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;
        let token_type = token_response
            .token_type
            .unwrap_or_else(|| "Bearer".to_string());
        let expires_in = token_response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

        let expires_at = Utc::now() + Duration::seconds(expires_in);
        info!("Token exchange successful; expires at {}", expires_at);

        Ok(TokenRecord::new(access_token, token_type, expires_at))
    }
}
