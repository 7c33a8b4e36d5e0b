pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod llm;
pub mod logging;
pub mod ninja;

use std::sync::Arc;

use tokio::sync::watch;

use config::Settings;
use engine::router::{RouterOptions, TicketRouter};
use engine::store::SqliteSolutionStore;
use engine::webhook::{start_webhook_server, WebhookState};
use error::AppError;

/// Wire up settings, logging, storage, and clients, then serve webhooks until
/// Ctrl-C.
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let _log_guard = logging::init(&settings.log_level, settings.log_dir.as_deref());
    if let Some(dir) = settings.log_dir.as_deref() {
        logging::install_crash_hook(dir);
    }

    tracing::info!("Starting NinjaOne triage agent v{}", env!("CARGO_PKG_VERSION"));

    if settings.webhook_secret.is_none() {
        tracing::warn!("NINJA_WEBHOOK_SECRET is not set: webhook signatures are NOT verified (insecure)");
    }
    if settings.allow_autofix {
        tracing::info!("Autofix enabled: matching runbooks will run after each new solution");
    }

    let pool = db::init_db(&settings.db_path)?;
    let store = Arc::new(SqliteSolutionStore::new(pool));
    let api = Arc::new(ninja::client::NinjaClient::from_settings(&settings)?);
    let triage = Arc::new(llm::client::OpenAiTriage::from_settings(&settings)?);

    let router = TicketRouter::new(
        api,
        triage,
        store,
        RouterOptions { allow_autofix: settings.allow_autofix },
    );
    let state = Arc::new(WebhookState {
        router,
        webhook_secret: settings.webhook_secret.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    start_webhook_server(state, settings.bind_addr, shutdown_rx).await
}
