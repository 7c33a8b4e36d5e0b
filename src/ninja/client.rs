use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Settings;
use crate::engine::router::TicketingApi;
use crate::error::AppError;
use crate::ninja::types::*;

// ============================================================================
// Helper
// ============================================================================

fn ninja_err(e: impl std::fmt::Display) -> AppError {
    AppError::Ninja(e.to_string())
}

/// Timeout for token exchange and reads.
const READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for writes (comments, script runs).
const WRITE_TIMEOUT: Duration = Duration::from_secs(60);
/// Refresh the token when it expires within this window.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
/// Upper bound on a server-reported token lifetime.
const MAX_TOKEN_TTL_SECS: u64 = 86_400;

// ============================================================================
// Token cache
// ============================================================================

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn from_response(resp: TokenResponse, now: Instant) -> Self {
        let ttl = resp
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS)
            .min(MAX_TOKEN_TTL_SECS);
        let expires_at = now
            .checked_add(Duration::from_secs(ttl))
            .or_else(|| now.checked_add(Duration::from_secs(DEFAULT_TOKEN_TTL_SECS)))
            .unwrap_or(now);
        Self {
            value: resp.access_token,
            expires_at,
        }
    }

    /// Usable if it stays valid for longer than the refresh margin.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

// ============================================================================
// NinjaClient
// ============================================================================

/// NinjaOne public API client using OAuth2 client credentials.
///
/// The bearer token is cached in the client and shared by all concurrent
/// deliveries. The lock is never held across the token request, so racing
/// refreshes are possible; the last successful one wins.
pub struct NinjaClient {
    http: reqwest::Client,
    base_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    token: RwLock<Option<CachedToken>>,
}

impl NinjaClient {
    pub fn new(
        base_url: String,
        auth_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("failed to build reqwest client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url,
            client_id,
            client_secret,
            scope,
            token: RwLock::new(None),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        if settings.ninja_client_id.is_empty() || settings.ninja_client_secret.is_empty() {
            tracing::warn!("NINJA_CLIENT_ID / NINJA_CLIENT_SECRET not set; NinjaOne calls will fail");
        }
        Self::new(
            settings.ninja_base_url.clone(),
            settings.ninja_auth_url.clone(),
            settings.ninja_client_id.clone(),
            settings.ninja_client_secret.clone(),
            settings.ninja_scope.clone(),
        )
    }

    // --------------------------------------------------------------------
    // Private HTTP helpers
    // --------------------------------------------------------------------

    /// Return a bearer token, fetching a new one when absent or about to expire.
    async fn bearer(&self) -> Result<String, AppError> {
        if let Some(tok) = self.token.read().await.as_ref() {
            if tok.is_fresh(Instant::now()) {
                return Ok(tok.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *self.token.write().await = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken, AppError> {
        tracing::debug!("Refreshing NinjaOne access token");
        let form = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scope: &self.scope,
        };
        let resp = self
            .http
            .post(&self.auth_url)
            .timeout(READ_TIMEOUT)
            .form(&form)
            .send()
            .await
            .map_err(ninja_err)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Ninja(format!("Token request failed ({}): {}", status, body)));
        }
        let token: TokenResponse = resp.json().await.map_err(ninja_err)?;
        Ok(CachedToken::from_response(token, Instant::now()))
    }

    async fn authed(
        &self,
        method: reqwest::Method,
        path: &str,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let token = self.bearer().await?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout)
            .bearer_auth(token))
    }

    /// Send a request, check the status, and parse the body as JSON.
    /// An empty body yields an empty object.
    async fn send_json(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value, AppError> {
        let resp = req.send().await.map_err(ninja_err)?;
        let status = resp.status();
        let body = resp.text().await.map_err(ninja_err)?;
        if !status.is_success() {
            return Err(AppError::Ninja(format!(
                "NinjaOne API error ({}): {}",
                status, body
            )));
        }
        if body.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&body).map_err(ninja_err)
    }

    async fn write_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, AppError> {
        let req = self.authed(method, path, WRITE_TIMEOUT).await?.json(body);
        self.send_json(req).await
    }

    // --------------------------------------------------------------------
    // Endpoints
    // --------------------------------------------------------------------

    /// `GET /api/v2/devices/{id}`
    pub async fn get_device(&self, device_id: i64) -> Result<serde_json::Value, AppError> {
        let path = format!("/api/v2/devices/{}", device_id);
        let req = self.authed(reqwest::Method::GET, &path, READ_TIMEOUT).await?;
        self.send_json(req).await
    }

    /// `PATCH /api/v2/tickets/{id}` with a single comment.
    pub async fn add_ticket_comment(
        &self,
        ticket_id: i64,
        text: &str,
        is_public: bool,
    ) -> Result<(), AppError> {
        let path = format!("/api/v2/tickets/{}", ticket_id);
        let body = TicketCommentUpdate {
            comments: vec![TicketComment { is_public, text }],
        };
        self.write_json(reqwest::Method::PATCH, &path, &body).await?;
        Ok(())
    }

    /// `POST /api/v2/devices/{id}/script/run`
    pub async fn run_script(
        &self,
        device_id: i64,
        script_id: i64,
        parameters: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let path = format!("/api/v2/devices/{}/script/run", device_id);
        let body = ScriptRunBody { kind: "SCRIPT", id: script_id, parameters };
        self.write_json(reqwest::Method::POST, &path, &body).await
    }
}

#[async_trait]
impl TicketingApi for NinjaClient {
    async fn get_device(&self, device_id: i64) -> Result<serde_json::Value, AppError> {
        NinjaClient::get_device(self, device_id).await
    }

    async fn add_ticket_comment(
        &self,
        ticket_id: i64,
        text: &str,
        is_public: bool,
    ) -> Result<(), AppError> {
        NinjaClient::add_ticket_comment(self, ticket_id, text, is_public).await
    }

    async fn run_script(
        &self,
        device_id: i64,
        script_id: i64,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        NinjaClient::run_script(self, device_id, script_id, params).await
    }
}
