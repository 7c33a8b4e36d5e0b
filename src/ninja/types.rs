use serde::{Deserialize, Serialize};

// ============================================================================
// OAuth
// ============================================================================

/// Client-credentials grant sent as a form body.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scope: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// ============================================================================
// Tickets
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment<'a> {
    pub is_public: bool,
    pub text: &'a str,
}

/// `PATCH /api/v2/tickets/{id}` body that appends comments.
#[derive(Debug, Clone, Serialize)]
pub struct TicketCommentUpdate<'a> {
    pub comments: Vec<TicketComment<'a>>,
}

// ============================================================================
// Scripts
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ScriptRunBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: i64,
    pub parameters: serde_json::Value,
}
