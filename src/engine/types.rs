use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound webhook event
// ============================================================================

/// Ticket webhook payload as delivered by NinjaOne.
///
/// Only `eventType` and `ticketId` are required; everything else is optional
/// and defaults to absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEvent {
    pub event_type: String,
    pub ticket_id: i64,
    #[serde(default)]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_comment_text: Option<String>,
    #[serde(default)]
    pub last_comment_is_public: Option<bool>,
    /// e.g. TECHNICIAN, END_USER, AUTOMATION
    #[serde(default)]
    pub last_comment_author_role: Option<String>,
    #[serde(default)]
    pub last_comment_author_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    Other,
}

impl TicketEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "TICKET_CREATED" => EventKind::Created,
            "TICKET_UPDATED" => EventKind::Updated,
            _ => EventKind::Other,
        }
    }

    /// Device to fetch facts for. A zero id is treated as "no device".
    pub fn device(&self) -> Option<i64> {
        self.device_id.filter(|id| *id != 0)
    }

    /// Title and description joined by a newline, trimmed.
    pub fn ticket_text(&self) -> String {
        format!(
            "{}\n{}",
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

// ============================================================================
// Solution
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured remediation proposal. `solution_steps` order is the canonical
/// index order used by alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub summary: String,
    pub probable_cause: String,
    pub solution_steps: Vec<String>,
    #[serde(default)]
    pub roll_back_plan: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    #[serde(default)]
    pub labels: Vec<String>,
    pub notes_for_ticket: String,
}

impl Solution {
    /// Confidence as a whole percentage, truncated.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0) as u32
    }
}

// ============================================================================
// Alignment
// ============================================================================

/// Keyword evidence for one addressed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvidence {
    pub index: usize,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    pub aligned: bool,
    /// Indices of steps with no keyword evidence, in step order.
    pub missing: Vec<usize>,
    pub evidence: Vec<StepEvidence>,
}

// ============================================================================
// Routing outcome
// ============================================================================

/// Per-ticket state, derived from the presence of a stored solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    NoSolution,
    Suggested,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::NoSolution => "none",
            TicketState::Suggested => "suggested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CreatedSuggested,
    UpdatedIgnored,
    UpdatedSeeded,
    UpdatedAligned,
    UpdatedAugmented,
    UpdatedNoGaps,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CreatedSuggested => "created_suggested",
            Phase::UpdatedIgnored => "updated_ignored",
            Phase::UpdatedSeeded => "updated_seeded",
            Phase::UpdatedAligned => "updated_aligned",
            Phase::UpdatedAugmented => "updated_augmented",
            Phase::UpdatedNoGaps => "updated_no_gaps",
        }
    }
}

/// Result of routing one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Unrecognized event type; carries the type as received.
    Ignored(String),
    Handled {
        ticket_id: i64,
        phase: Phase,
        /// Missing step indices; only non-empty for `UpdatedAugmented`.
        missing: Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_minimal_payload() {
        let event: TicketEvent =
            serde_json::from_str(r#"{"eventType":"TICKET_CREATED","ticketId":42}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Created);
        assert_eq!(event.ticket_id, 42);
        assert!(event.device().is_none());
        assert_eq!(event.ticket_text(), "");
    }

    #[test]
    fn test_event_requires_integer_ticket_id() {
        assert!(serde_json::from_str::<TicketEvent>(r#"{"eventType":"TICKET_CREATED"}"#).is_err());
        assert!(serde_json::from_str::<TicketEvent>(
            r#"{"eventType":"TICKET_CREATED","ticketId":"abc"}"#
        )
        .is_err());
    }

    #[test]
    fn test_zero_device_is_absent() {
        let event: TicketEvent = serde_json::from_str(
            r#"{"eventType":"TICKET_UPDATED","ticketId":1,"deviceId":0,"title":"Printer offline","description":"spooler stuck"}"#,
        )
        .unwrap();
        assert!(event.device().is_none());
        assert_eq!(event.ticket_text(), "Printer offline\nspooler stuck");
    }

    #[test]
    fn test_unknown_event_kind() {
        let event: TicketEvent =
            serde_json::from_str(r#"{"eventType":"TICKET_DELETED","ticketId":1}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Other);
    }

    #[test]
    fn test_solution_defaults_and_percent() {
        let solution: Solution = serde_json::from_str(
            r#"{"summary":"s","probable_cause":"c","solution_steps":[],"risk_level":"high","confidence":0.876,"notes_for_ticket":"n"}"#,
        )
        .unwrap();
        assert_eq!(solution.risk_level, RiskLevel::High);
        assert!(solution.labels.is_empty());
        assert_eq!(solution.roll_back_plan, "");
        assert_eq!(solution.confidence_percent(), 87);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Phase::UpdatedNoGaps).unwrap(),
            serde_json::json!("updated_no_gaps")
        );
        assert_eq!(Phase::CreatedSuggested.as_str(), "created_suggested");
    }
}
