//! Etsy Seller MCP Server - Main entry point.
//!
//! Serves the MCP tool surface over stdio. On startup, a previously persisted
//! session is restored from the OS keychain if it has not expired.

mod etsy_client;
mod handler;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rmcp::{transport::stdio, ServiceExt};
use tracing::{info, warn};

use etsymcp_auth::{EtsyTokenExchanger, SessionOrchestrator, SystemBrowser};
use etsymcp_core::{AuthConfig, AuthError, SessionStore, TokenRecord};
use etsymcp_storage::KeychainSessionStore;

use handler::EtsySellerHandler;

/// Fallback store when the platform keychain is unusable: the session works
/// for this process lifetime and is lost on restart.
struct NullSessionStore;

#[async_trait]
impl SessionStore for NullSessionStore {
    async fn save(&self, _token: &TokenRecord) -> Result<(), AuthError> {
        Ok(())
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        Ok(None)
    }

    async fn delete(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Get the logs directory path (under the platform data directory)
fn get_logs_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("etsy-seller-mcp")
        .join("logs")
}

/// Initialize tracing with console and file logging.
///
/// Console output goes to stderr: stdout carries the MCP stdio transport.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let logs_dir = get_logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    // Daily rotation: etsy-seller-mcp.2026-08-30.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("etsy-seller-mcp")
        .filename_suffix("log")
        .build(&logs_dir)
        .expect("Failed to create log file appender");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG takes precedence, with sensible defaults for our crates
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("etsymcp_core=debug".parse().unwrap())
            .add_directive("etsymcp_auth=debug".parse().unwrap())
            .add_directive("etsymcp_storage=debug".parse().unwrap())
            .add_directive("etsymcp_server=debug".parse().unwrap())
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_file(false)
        .with_line_number(false)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn build_orchestrator() -> Option<Arc<SessionOrchestrator>> {
    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("OAuth manager not initialized: {}", e);
            warn!("Set ETSY_API_KEY to use the connect_etsy tool.");
            return None;
        }
    };

    let exchanger = match EtsyTokenExchanger::new(&config) {
        Ok(exchanger) => Arc::new(exchanger),
        Err(e) => {
            warn!("Token exchanger not initialized: {}", e);
            return None;
        }
    };

    let store: Arc<dyn SessionStore> = match KeychainSessionStore::new() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("System keyring unavailable ({}); session will not persist", e);
            Arc::new(NullSessionStore)
        }
    };

    Some(Arc::new(SessionOrchestrator::new(
        config,
        exchanger,
        store,
        Arc::new(SystemBrowser),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (for development)
    dotenvy::dotenv().ok();

    let _guard = init_tracing();

    let orchestrator = build_orchestrator();

    if let Some(orchestrator) = &orchestrator {
        if orchestrator.restore().await {
            info!("Existing Etsy session restored from keyring");
        }
    }

    info!("Starting Etsy Seller MCP server on stdio");
    let service = EtsySellerHandler::new(orchestrator).serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
