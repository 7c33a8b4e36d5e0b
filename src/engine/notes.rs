use super::runbooks::Runbook;
use super::types::Solution;

pub const ANALYZING_NOTE: &str = "Agent: analyzing ticket with AI…";
pub const SEEDING_NOTE: &str = "Agent: generating initial private solution (late attach)…";

pub fn device_facts_error_note(error: &impl std::fmt::Display) -> String {
    format!("Could not fetch device facts: {error}")
}

/// Full plan note posted after a solution is generated.
pub fn format_solution_note(solution: &Solution, runbook: Option<&Runbook>, source: &str) -> String {
    let mut lines = vec![
        format!(
            "AI Solution (risk: {}, confidence: {}%):",
            solution.risk_level,
            solution.confidence_percent()
        ),
        format!("Summary: {}", solution.summary),
        format!("Probable cause: {}", solution.probable_cause),
        "Steps:".to_string(),
    ];
    lines.extend(solution.solution_steps.iter().map(|s| format!("- {s}")));

    if !solution.roll_back_plan.is_empty() {
        lines.push(format!("Rollback: {}", solution.roll_back_plan));
    }
    if let Some(rb) = runbook {
        lines.push(format!("Suggested runbook: {} (risk: {})", rb.description, rb.risk));
    }

    lines.push(format!("\n(Generated by {source} via the OpenAI API)"));
    lines.join("\n")
}

/// Follow-up note listing only the steps the technician has not covered.
pub fn format_missing_steps_note<'a>(missing_steps: impl IntoIterator<Item = &'a str>) -> String {
    let mut lines = vec!["Additional private suggestions (based on earlier AI plan):".to_string()];
    lines.extend(missing_steps.into_iter().map(|s| format!("- {s}")));
    lines.push("\n(Private note from AI to reduce back-and-forth; ignore if already handled.)".into());
    lines.join("\n")
}
