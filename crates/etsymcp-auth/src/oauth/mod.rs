//! OAuth 2.0 PKCE implementation
//!
//! Provides the four building blocks of the authorization flow:
//! PKCE/state generation, authorization-URL construction, the loopback
//! callback listener, and the code-for-token exchange.

mod authorize;
mod callback;
mod exchange;
mod pkce;

pub use authorize::{build_authorization_url, create_authorization_request, AuthorizationRequest};
pub use callback::{CallbackListener, CallbackResult};
pub use exchange::{EtsyTokenExchanger, TokenExchanger};
pub use pkce::{generate_state, PkceChallenge};
