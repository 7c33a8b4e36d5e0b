use async_trait::async_trait;

use super::types::{RiskLevel, Solution};
use crate::error::AppError;

/// Characters of ticket text sent to the model.
pub const MAX_TICKET_TEXT_CHARS: usize = 6000;
/// Characters of serialized device facts sent to the model.
pub const MAX_DEVICE_FACTS_CHARS: usize = 6000;

/// Bounded input for one triage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageRequest {
    pub ticket_text: String,
    /// Device facts as (possibly truncated) JSON text.
    pub device_facts: String,
}

impl TriageRequest {
    pub fn new(ticket_text: &str, device_facts: &serde_json::Value) -> Self {
        let facts = serde_json::to_string(device_facts).unwrap_or_else(|_| "{}".into());
        Self {
            ticket_text: truncate_chars(ticket_text, MAX_TICKET_TEXT_CHARS),
            device_facts: truncate_chars(&facts, MAX_DEVICE_FACTS_CHARS),
        }
    }
}

/// Produces a structured solution for a ticket.
///
/// Implementations report every failure as an error; [`generate_solution`]
/// turns those into the fallback plan.
#[async_trait]
pub trait TriageRequester: Send + Sync {
    async fn request(&self, request: &TriageRequest) -> Result<Solution, AppError>;

    /// Name shown in the footer of posted notes.
    fn source_name(&self) -> &str;
}

/// Request a solution, substituting the fallback on any failure.
pub async fn generate_solution(
    requester: &dyn TriageRequester,
    ticket_text: &str,
    device_facts: &serde_json::Value,
) -> Solution {
    let request = TriageRequest::new(ticket_text, device_facts);
    match requester.request(&request).await {
        Ok(solution) => solution,
        Err(e) => {
            tracing::warn!(error = %e, "Triage request failed, using fallback solution");
            fallback_solution(ticket_text)
        }
    }
}

/// Deterministic plan used when the model call fails or returns junk.
pub fn fallback_solution(ticket_text: &str) -> Solution {
    Solution {
        summary: "Triage failed to parse structured output.".into(),
        probable_cause: "Unknown".into(),
        solution_steps: Vec::new(),
        roll_back_plan: "N/A".into(),
        risk_level: RiskLevel::Medium,
        confidence: 0.3,
        labels: vec![quick_label(ticket_text).to_string()],
        notes_for_ticket: "AI could not produce a structured solution. Please review manually.".into(),
    }
}

/// Keyword-based incident label for tickets the model could not classify.
pub fn quick_label(text: &str) -> &'static str {
    let t = text.to_lowercase();
    if t.contains("print") && t.contains("spool") {
        "PRINT_SPOOLER_STALLED"
    } else if t.contains("disk") || t.contains("100%") {
        "DISK_100_UTIL"
    } else {
        "OTHER"
    }
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Option<TriageRequest>>,
        result: Option<Solution>,
    }

    #[async_trait]
    impl TriageRequester for Recording {
        async fn request(&self, request: &TriageRequest) -> Result<Solution, AppError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            self.result
                .clone()
                .ok_or_else(|| AppError::Llm("model unavailable".into()))
        }

        fn source_name(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_request_is_bounded() {
        let text = "x".repeat(MAX_TICKET_TEXT_CHARS + 100);
        let facts = serde_json::json!({ "blob": "y".repeat(MAX_DEVICE_FACTS_CHARS * 2) });
        let req = TriageRequest::new(&text, &facts);
        assert_eq!(req.ticket_text.chars().count(), MAX_TICKET_TEXT_CHARS);
        assert_eq!(req.device_facts.chars().count(), MAX_DEVICE_FACTS_CHARS);
    }

    #[test]
    fn test_fallback_shape() {
        let s = fallback_solution("Printer offline\nspooler stuck");
        assert_eq!(s.probable_cause, "Unknown");
        assert!(s.solution_steps.is_empty());
        assert_eq!(s.risk_level, RiskLevel::Medium);
        assert_eq!(s.confidence, 0.3);
        assert_eq!(s.labels, vec!["PRINT_SPOOLER_STALLED"]);
        assert!(s.notes_for_ticket.contains("review manually"));
    }

    #[test]
    fn test_quick_label() {
        assert_eq!(quick_label("Print SPOOLER hung"), "PRINT_SPOOLER_STALLED");
        assert_eq!(quick_label("Disk at 100%"), "DISK_100_UTIL");
        assert_eq!(quick_label("Outlook crashes"), "OTHER");
    }

    #[tokio::test]
    async fn test_generate_solution_falls_back_on_error() {
        let requester = Recording { seen: Mutex::new(None), result: None };
        let solution = generate_solution(&requester, "Outlook crashes", &serde_json::json!({})).await;
        assert_eq!(solution, fallback_solution("Outlook crashes"));
        let seen = requester.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.device_facts, "{}");
    }

    #[tokio::test]
    async fn test_generate_solution_passes_through_success() {
        let mut expected = fallback_solution("x");
        expected.summary = "Real answer".into();
        let requester = Recording { seen: Mutex::new(None), result: Some(expected.clone()) };
        let solution = generate_solution(&requester, "x", &serde_json::json!({"os": "win"})).await;
        assert_eq!(solution, expected);
    }
}
