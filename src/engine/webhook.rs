use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use super::router::TicketRouter;
use super::signature::{verify_signature, SIGNATURE_HEADER};
use super::types::{Outcome, Phase, TicketEvent};
use crate::error::AppError;

/// Shared state for the webhook HTTP server.
pub struct WebhookState {
    pub router: TicketRouter,
    /// `None` disables signature checks (open mode).
    pub webhook_secret: Option<String>,
}

pub fn build_app(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhooks/ninjaone", post(handle_webhook))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown_rx` changes.
pub async fn start_webhook_server(
    state: Arc<WebhookState>,
    addr: SocketAddr,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), AppError> {
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Webhook server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Webhook server shutting down");
        })
        .await?;

    Ok(())
}

/// Liveness check. No side effects.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Serialize, PartialEq)]
struct WebhookResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticket: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<Vec<usize>>,
}

impl From<Outcome> for WebhookResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ignored(event_type) => Self {
                ok: true,
                ticket: None,
                phase: None,
                ignored: Some(event_type),
                missing: None,
            },
            Outcome::Handled { ticket_id, phase, missing } => Self {
                ok: true,
                ticket: Some(ticket_id),
                phase: Some(phase),
                ignored: None,
                missing: (phase == Phase::UpdatedAugmented).then_some(missing),
            },
        }
    }
}

/// Verify and decode a raw delivery. Nothing downstream runs on error.
fn parse_delivery(
    secret: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<TicketEvent, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    verify_signature(secret, body, signature)?;

    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::Validation("Invalid JSON payload".into()))?;

    serde_json::from_value(payload)
        .map_err(|e| AppError::Validation(format!("Invalid webhook schema: {e}")))
}

/// POST /webhooks/ninjaone: verify signature, decode the event, route it.
async fn handle_webhook(
    AxumState(state): AxumState<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = match parse_delivery(state.webhook_secret.as_deref(), &headers, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            return e.into_response();
        }
    };

    let span = tracing::info_span!(
        "delivery",
        delivery_id = %uuid::Uuid::new_v4(),
        ticket_id = event.ticket_id,
        event_type = %event.event_type,
    );
    let outcome = state.router.handle(&event).instrument(span).await;

    (StatusCode::OK, Json(WebhookResponse::from(outcome))).into_response()
}
