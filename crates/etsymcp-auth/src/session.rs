//! Session orchestrator
//!
//! The connect/restore/disconnect state machine. One owned instance holds the
//! single in-memory token slot behind a lock; all collaborators (exchanger,
//! store, browser) are injected so the flow can be driven end-to-end in tests.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use etsymcp_core::{AuthConfig, AuthError, ConnectionStatus, SessionStore, TokenRecord};

use crate::oauth::{create_authorization_request, CallbackListener, TokenExchanger};

/// Seam for triggering external browser navigation.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens the user's default browser.
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that_detached(url)
    }
}

/// Sequences the OAuth flow and owns the process-wide session slot.
pub struct SessionOrchestrator {
    config: AuthConfig,
    exchanger: Arc<dyn TokenExchanger>,
    store: Arc<dyn SessionStore>,
    browser: Arc<dyn BrowserOpener>,
    /// The single active token; mutations are atomic with respect to reads.
    session: Mutex<Option<TokenRecord>>,
    /// Serializes connect attempts so two listeners never race for the port.
    connect_guard: Mutex<()>,
}

impl SessionOrchestrator {
    pub fn new(
        config: AuthConfig,
        exchanger: Arc<dyn TokenExchanger>,
        store: Arc<dyn SessionStore>,
        browser: Arc<dyn BrowserOpener>,
    ) -> Self {
        Self {
            config,
            exchanger,
            store,
            browser,
            session: Mutex::new(None),
            connect_guard: Mutex::new(()),
        }
    }

    /// Run the full browser-driven authorization flow.
    ///
    /// Generates a fresh PKCE pair and CSRF state for this attempt, opens the
    /// browser at the authorization URL, and waits (up to the configured
    /// timeout) for the loopback callback. On a verified callback the code is
    /// exchanged, and the token is held in memory and persisted.
    ///
    /// The callback listener is always stopped before returning. Storage
    /// failures are downgraded to warnings: the session then lives in memory
    /// only and is lost on restart.
    pub async fn connect(&self, scopes: &[String]) -> Result<TokenRecord, AuthError> {
        let _guard = self.connect_guard.lock().await;

        let request = create_authorization_request(&self.config, scopes)?;
        let mut listener = CallbackListener::start(&self.config.redirect_uri).await?;

        info!(
            "Opening browser for Etsy authorization. If it does not open, visit:\n{}",
            request.authorization_url
        );
        if let Err(e) = self.browser.open(&request.authorization_url) {
            // Not retried: the URL above lets the user navigate manually.
            warn!("Could not open browser automatically: {}", e);
        }

        let outcome = listener.wait_for_result(self.config.auth_wait).await;
        listener.stop().await;
        let callback = outcome?;

        if let Some(error) = callback.error {
            return Err(AuthError::AuthorizationDenied(error));
        }

        let code = callback.code.ok_or(AuthError::MissingCode)?;

        if callback.state.as_deref() != Some(request.state.as_str()) {
            // Security event: this code must never be exchanged.
            warn!("Callback state does not match the state generated for this attempt");
            return Err(AuthError::CsrfMismatch);
        }

        let token = self
            .exchanger
            .exchange_code(&code, &request.code_verifier)
            .await?;

        *self.session.lock().await = Some(token.clone());

        if let Err(e) = self.store.save(&token).await {
            warn!("Could not persist token; session is memory-only: {}", e);
        }

        info!("Connected to Etsy; token expires at {}", token.expires_at);
        Ok(token)
    }

    /// Restore a persisted session, if a non-expired one exists.
    ///
    /// Invoked once at process start. Never opens a browser; storage failures
    /// are treated as "no stored session".
    pub async fn restore(&self) -> bool {
        match self.store.load().await {
            Ok(Some(token)) => {
                info!(
                    "Session restored from keyring; token expires at {}",
                    token.expires_at
                );
                *self.session.lock().await = Some(token);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read stored session: {}", e);
                false
            }
        }
    }

    /// Clear the in-memory token and the stored copy.
    pub async fn disconnect(&self) -> Result<(), AuthError> {
        {
            let mut session = self.session.lock().await;
            if session.is_none() {
                return Err(AuthError::NotConnected);
            }
            *session = None;
        }

        if let Err(e) = self.store.delete().await {
            warn!("Could not clear stored token: {}", e);
        }

        info!("Disconnected from Etsy; token cleared from memory and keyring");
        Ok(())
    }

    /// Pure read of the current connection state.
    pub async fn status(&self) -> ConnectionStatus {
        match self.session.lock().await.as_ref() {
            Some(token) if !token.is_expired() => ConnectionStatus {
                connected: true,
                expires_at: Some(token.expires_at),
            },
            _ => ConnectionStatus::disconnected(),
        }
    }

    /// Bearer token for the authenticated request collaborator.
    ///
    /// An expired token is never handed out.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.access_token.clone())
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
