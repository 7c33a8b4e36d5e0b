use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::schema::{response_format, solution_schema, user_prompt, SYSTEM_RULES};
use crate::config::Settings;
use crate::engine::triage::{TriageRequest, TriageRequester};
use crate::engine::types::Solution;
use crate::error::AppError;

fn llm_err(e: impl std::fmt::Display) -> AppError {
    AppError::Llm(e.to_string())
}

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.2;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// OpenAiTriage
// ============================================================================

/// Triage requester backed by the OpenAI chat completions API with a
/// strict JSON-schema response format.
pub struct OpenAiTriage {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_output_tokens: u32,
    validator: jsonschema::Validator,
}

impl OpenAiTriage {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        max_output_tokens: u32,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build reqwest client: {e}")))?;
        let validator = jsonschema::validator_for(&solution_schema())
            .map_err(|e| AppError::Internal(format!("invalid solution schema: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_output_tokens,
            validator,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        if settings.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; every ticket will get the fallback solution");
        }
        Self::new(
            settings.openai_base_url.clone(),
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
            settings.openai_max_output_tokens,
        )
    }

    /// Decode model output: JSON, then schema validation, then the typed record.
    pub fn parse_solution(&self, content: &str) -> Result<Solution, AppError> {
        let value: serde_json::Value = serde_json::from_str(content.trim())
            .map_err(|e| AppError::Llm(format!("Output is not JSON: {e}")))?;

        let violations: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(AppError::Llm(format!(
                "Output violates solution schema: {}",
                violations.join("; ")
            )));
        }

        serde_json::from_value(value).map_err(llm_err)
    }
}

#[async_trait]
impl TriageRequester for OpenAiTriage {
    async fn request(&self, request: &TriageRequest) -> Result<Solution, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Llm("OPENAI_API_KEY is not configured".into()))?;

        let prompt = user_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_RULES },
                ChatMessage { role: "user", content: &prompt },
            ],
            response_format: response_format(),
            max_tokens: self.max_output_tokens,
            temperature: TEMPERATURE,
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(llm_err)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("OpenAI API error ({}): {}", status, text)));
        }

        let chat: ChatResponse = resp.json().await.map_err(llm_err)?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm("Empty completion".into()))?;

        let solution = self.parse_solution(&content)?;
        tracing::debug!(
            steps = solution.solution_steps.len(),
            risk = %solution.risk_level,
            confidence = solution.confidence,
            "Model returned structured solution"
        );
        Ok(solution)
    }

    fn source_name(&self) -> &str {
        &self.model
    }
}
