//! Authorization URL construction
//!
//! Builds the browser-facing authorization URL with the PKCE challenge and
//! CSRF state. Pure functions; the caller owns the state and verifier until
//! the callback comes back.

use tracing::debug;
use url::Url;

use etsymcp_core::{AuthConfig, AuthError};

use super::pkce::{generate_state, PkceChallenge};

/// Authorization request to be opened in browser
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full authorization URL to open
    pub authorization_url: String,
    /// State parameter for CSRF protection
    pub state: String,
    /// PKCE verifier (keep secret, use in token exchange)
    pub code_verifier: String,
}

/// Build the provider authorization URL.
///
/// Every value is percent-encoded through `Url`'s query serializer; scopes are
/// space-joined per the OAuth spec.
pub fn build_authorization_url(
    authorize_endpoint: &str,
    api_key: &str,
    redirect_uri: &str,
    scopes: &[String],
    challenge: &str,
    state: &str,
) -> Result<String, AuthError> {
    let mut url = Url::parse(authorize_endpoint)
        .map_err(|e| AuthError::Configuration(format!("invalid authorize URL: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", api_key);
        query.append_pair("redirect_uri", redirect_uri);
        query.append_pair("scope", &scopes.join(" "));
        query.append_pair("state", state);
        query.append_pair("code_challenge", challenge);
        query.append_pair("code_challenge_method", "S256");
    }

    Ok(url.to_string())
}

/// Generate a fresh PKCE pair and state and build the authorization URL.
///
/// State and verifier are single-use: they belong to this attempt only and
/// must never be reused across attempts.
pub fn create_authorization_request(
    config: &AuthConfig,
    scopes: &[String],
) -> Result<AuthorizationRequest, AuthError> {
    let state = generate_state();
    let pkce = PkceChallenge::generate();

    let authorization_url = build_authorization_url(
        &config.authorize_url,
        &config.api_key,
        &config.redirect_uri,
        scopes,
        &pkce.challenge,
        &state,
    )?;

    debug!("Created authorization URL: {}", authorization_url);

    Ok(AuthorizationRequest {
        authorization_url,
        state,
        code_verifier: pkce.verifier,
    })
}
