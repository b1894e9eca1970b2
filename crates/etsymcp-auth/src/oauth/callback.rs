//! Loopback callback listener
//!
//! A short-lived local HTTP endpoint that receives the provider's redirect,
//! renders a human-facing result page, and hands the query parameters to the
//! blocked `connect` flow through a one-shot channel.
//!
//! The accept loop runs on a spawned tokio task; delivery to the waiter is a
//! `oneshot` send, so the browser's page render never waits on the
//! orchestrator and the orchestrator cannot observe a result before the
//! listener has captured it. The sink fires at most once; anything after the
//! first delivery only gets a page.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use etsymcp_core::AuthError;

/// Bounded wait when joining the serve task during `stop`.
const STOP_JOIN_WAIT: Duration = Duration::from_secs(5);

/// Query parameters captured from the provider's redirect.
///
/// Produced exactly once per listener; consumed exactly once by the waiter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackResult {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

type ResultSink = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

/// One-shot local HTTP listener for the OAuth redirect.
pub struct CallbackListener {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<CallbackResult>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    serve_task: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind the host/port named by the redirect URI and start serving its
    /// path in a background task.
    ///
    /// A bind failure (port already in use) is fatal to the connect attempt.
    pub async fn start(redirect_uri: &str) -> Result<Self, AuthError> {
        let (host, port, path) = parse_redirect_uri(redirect_uri)?;
        let addr = format!("{host}:{port}");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AuthError::ListenerBind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AuthError::ListenerBind { addr, source })?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let sink: ResultSink = Arc::new(Mutex::new(Some(result_tx)));
        let app = Router::new()
            .route(&path, get(handle_redirect))
            .with_state(sink);

        let serve_task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!("Callback listener exited with error: {}", e);
            }
        });

        info!("OAuth callback listener on http://{}{}", local_addr, path);

        Ok(Self {
            local_addr,
            result_rx,
            shutdown_tx: Some(shutdown_tx),
            serve_task,
        })
    }

    /// The actual bound address (resolves port 0 for tests).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the redirect arrives or `timeout` elapses.
    ///
    /// The listener must still be stopped by the caller on either outcome.
    pub async fn wait_for_result(&mut self, timeout: Duration) -> Result<CallbackResult, AuthError> {
        match tokio::time::timeout(timeout, &mut self.result_rx).await {
            Ok(Ok(result)) => Ok(result),
            // Sender dropped without a result: the serve task died underneath
            // us, which the waiter can only treat as "no code arrived".
            Ok(Err(_)) => Err(AuthError::MissingCode),
            Err(_) => Err(AuthError::Timeout(timeout.as_secs())),
        }
    }

    /// Release the socket and join the serve task with a bounded wait.
    ///
    /// Safe to call when no callback was ever received.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(STOP_JOIN_WAIT, &mut self.serve_task)
            .await
            .is_err()
        {
            warn!("Callback listener did not shut down in time; aborting task");
            self.serve_task.abort();
        }
    }
}

/// Split a loopback redirect URI into bindable host, port, and route path.
fn parse_redirect_uri(redirect_uri: &str) -> Result<(String, u16, String), AuthError> {
    let url = Url::parse(redirect_uri).map_err(|e| {
        AuthError::Configuration(format!("invalid redirect URI {redirect_uri}: {e}"))
    })?;

    if url.scheme() != "http" {
        return Err(AuthError::Configuration(format!(
            "redirect URI must be a local http URL, got {redirect_uri}"
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| {
            AuthError::Configuration(format!("redirect URI {redirect_uri} has no host"))
        })?
        .to_string();
    let port = url.port().unwrap_or(80);

    let path = if url.path().is_empty() {
        "/".to_string()
    } else {
        url.path().to_string()
    };

    Ok((host, port, path))
}

async fn handle_redirect(
    State(sink): State<ResultSink>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let code = params.get("code").cloned();
    let state = params.get("state").cloned();
    let error = params.get("error").cloned();

    let (status, page, result) = if let Some(error) = error {
        debug!("Authorization callback carried error: {}", error);
        (
            StatusCode::BAD_REQUEST,
            error_page(&error),
            CallbackResult {
                code: None,
                state: None,
                error: Some(error),
            },
        )
    } else if code.is_some() {
        (
            StatusCode::OK,
            SUCCESS_PAGE.to_string(),
            CallbackResult {
                code,
                state,
                error: None,
            },
        )
    } else {
        // Neither code nor error: the waiter maps an empty result to a
        // missing-code failure.
        (
            StatusCode::BAD_REQUEST,
            INVALID_PAGE.to_string(),
            CallbackResult::default(),
        )
    };

    // Take the sink before writing the response; a second request to the same
    // listener finds it empty and only gets a page.
    let tx = sink.lock().ok().and_then(|mut slot| slot.take());
    match tx {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => debug!("Callback received after result delivery; ignored"),
    }

    (status, Html(page))
}

const SUCCESS_PAGE: &str = "<html>\n<head><title>Authorization Successful</title></head>\n<body>\n<h1>Authorization Successful!</h1>\n<p>You can close this window and return to your application.</p>\n<script>window.close();</script>\n</body>\n</html>\n";

const INVALID_PAGE: &str = "<html>\n<head><title>Invalid Request</title></head>\n<body>\n<h1>Invalid Request</h1>\n<p>Missing authorization code.</p>\n</body>\n</html>\n";

fn error_page(error: &str) -> String {
    format!(
        "<html>\n<head><title>Authorization Failed</title></head>\n<body>\n<h1>Authorization Failed</h1>\n<p>Error: {}</p>\n<p>You can close this window.</p>\n</body>\n</html>\n",
        html_escape(error)
    )
}

/// The error string is attacker-influenced query input; escape it before
/// interpolating into HTML.
fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
