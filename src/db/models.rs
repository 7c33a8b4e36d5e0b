use serde::{Deserialize, Serialize};

// ============================================================================
// Ticket Solutions
// ============================================================================

/// Raw `ticket_solution` row. The JSON is decoded into a
/// [`Solution`](crate::engine::types::Solution) by the repo layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub ticket_id: i64,
    pub solution_json: String,
    pub created_at: String,
}
