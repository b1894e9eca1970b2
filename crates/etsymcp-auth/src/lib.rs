//! # Etsy Seller MCP Auth Library
//!
//! OAuth 2.0 Authorization Code flow with PKCE against Etsy's v3 API, and the
//! session lifecycle built on top of it.
//!
//! The flow: `SessionOrchestrator::connect` generates a fresh PKCE pair and
//! CSRF state, opens the system browser at the authorization URL, and blocks
//! on a short-lived loopback HTTP listener until Etsy redirects back with an
//! authorization code. The code is exchanged for a bearer token, which is held
//! in memory and persisted to the OS keychain until expiry or disconnect.
//!
//! Sessions are deliberately not refreshed: when a token expires the user
//! reconnects through the browser.

pub mod oauth;
pub mod session;

pub use oauth::{
    build_authorization_url, create_authorization_request, generate_state, AuthorizationRequest,
    CallbackListener, CallbackResult, EtsyTokenExchanger, PkceChallenge, TokenExchanger,
};
pub use session::{BrowserOpener, SessionOrchestrator, SystemBrowser};
