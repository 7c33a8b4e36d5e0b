use crate::engine::triage::TriageRequest;

pub const SYSTEM_RULES: &str = "You are a senior RMM/ITSM engineer. Produce precise, minimally risky fixes. \
Prefer non-destructive steps first. If more data is needed, say so explicitly. \
Never invent commands that could harm endpoints. Output must be valid JSON per schema.";

/// JSON schema of a triage solution, in strict structured-output form.
pub fn solution_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string", "description": "One-sentence summary of the issue." },
            "probable_cause": { "type": "string", "description": "Most likely root cause." },
            "solution_steps": {
                "type": "array",
                "description": "Ordered, precise steps the tech should take.",
                "items": { "type": "string" }
            },
            "roll_back_plan": { "type": "string", "description": "How to undo if things go wrong." },
            "risk_level": { "type": "string", "enum": ["low", "medium", "high"] },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "labels": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Incident labels e.g. PRINT_SPOOLER_STALLED"
            },
            "notes_for_ticket": { "type": "string", "description": "Short copy-pastable resolution note for the ticket." }
        },
        "required": [
            "summary", "probable_cause", "solution_steps", "roll_back_plan",
            "risk_level", "confidence", "labels", "notes_for_ticket"
        ],
        "additionalProperties": false
    })
}

/// `response_format` block for the chat completions request.
pub fn response_format() -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "TriageSolution",
            "schema": solution_schema(),
            "strict": true
        }
    })
}

pub fn user_prompt(request: &TriageRequest) -> String {
    format!(
        "Ticket details:\n{}\n\nDevice facts (JSON):\n{}\n\n\
         Task: Analyze and propose the safest effective resolution following the schema.",
        request.ticket_text, request.device_facts
    )
}
