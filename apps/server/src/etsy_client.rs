//! Authenticated Etsy REST collaborator
//!
//! Thin wrapper that presents the bearer token and API key on Etsy v3 calls.
//! The orchestrator hands it a valid token; it adds no auth logic of its own.

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Etsy API v3 base URL.
const API_BASE: &str = "https://openapi.etsy.com/v3";

/// Client-level timeout for Etsy REST calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

pub struct EtsyApiClient {
    http_client: reqwest::Client,
    api_key: String,
    access_token: String,
}

impl EtsyApiClient {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            access_token: access_token.into(),
        })
    }

    /// GET an Etsy v3 application path and return the JSON body.
    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{API_BASE}{path}");
        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Etsy API returned HTTP {status}: {body}");
        }

        response.json().await.context("invalid JSON from Etsy API")
    }

    /// Get information about the currently authenticated user.
    pub async fn get_current_user(&self) -> Result<Value> {
        self.get("/application/users/me").await
    }

    /// Get shops owned by a user.
    pub async fn get_user_shops(&self, user_id: u64) -> Result<Value> {
        self.get(&format!("/application/users/{user_id}/shops"))
            .await
    }

    /// Resolve the authenticated user's shop without needing a shop id.
    pub async fn get_my_shop(&self) -> Result<Value> {
        let user = self.get_current_user().await?;
        let user_id = user
            .get("user_id")
            .and_then(Value::as_u64)
            .context("Etsy user response missing user_id")?;
        self.get_user_shops(user_id).await
    }
}
