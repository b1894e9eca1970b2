//! Authorization error taxonomy
//!
//! Every orchestrator operation returns `Result<T, AuthError>`; the MCP tool
//! boundary converts these into `{success: false, error: ...}` payloads so a
//! calling agent can render them. Only `Configuration` at startup prevents the
//! orchestrator from being constructed at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid configuration (e.g., no API key). Fatal to
    /// constructing the orchestrator; everything else keeps working.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The local callback port could not be bound. Fatal to this connect
    /// attempt; the user must free the port or change the redirect URI.
    #[error("callback listener failed to bind {addr}: {source}")]
    ListenerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider redirected back with an `error` parameter.
    #[error("authorization failed: {0}")]
    AuthorizationDenied(String),

    /// The `state` returned on the callback does not match the state generated
    /// for this attempt. The authorization code is never exchanged.
    #[error("state mismatch - possible CSRF attack")]
    CsrfMismatch,

    /// The callback carried neither a code nor an error.
    #[error("no authorization code received")]
    MissingCode,

    /// No callback arrived within the authorization wait window.
    #[error("authorization timed out after {0} seconds")]
    Timeout(u64),

    /// The token endpoint rejected the code/verifier. Authorization codes are
    /// single-use, so this is never retried; the user must reconnect.
    #[error("token exchange failed: HTTP {status} - {body}")]
    ExchangeFailed { status: u16, body: String },

    /// The token endpoint returned 2xx but the body was not usable.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// The token request never produced a response (connect/read failure).
    #[error("token request failed: {0}")]
    Network(String),

    /// The platform secret store could not be reached. Callers downgrade this
    /// to a warning and continue in-memory-only.
    #[error("credential store unavailable: {0}")]
    StorageUnavailable(String),

    /// Disconnect was called with no active session.
    #[error("no active Etsy connection to disconnect")]
    NotConnected,
}

impl AuthError {
    /// Whether the user can simply retry `connect` after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::AuthorizationDenied(_)
                | AuthError::CsrfMismatch
                | AuthError::MissingCode
                | AuthError::Timeout(_)
                | AuthError::ExchangeFailed { .. }
                | AuthError::Network(_)
        )
    }
}
