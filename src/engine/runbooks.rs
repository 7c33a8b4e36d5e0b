use super::types::{RiskLevel, Solution};

/// One step of a runbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunbookAction {
    /// Run a NinjaOne script against the ticket's device.
    RunScript {
        script_id: i64,
        params: &'static [(&'static str, &'static str)],
    },
    /// Post a private note on the ticket.
    Comment { text: &'static str },
}

impl RunbookAction {
    /// Script parameters as the JSON object the script-run endpoint expects.
    pub fn params_json(params: &[(&str, &str)]) -> serde_json::Value {
        let map = params
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runbook {
    pub label: &'static str,
    pub description: &'static str,
    pub risk: RiskLevel,
    pub actions: &'static [RunbookAction],
}

// Script ids are tenant-specific; replace with the ids of your own NinjaOne scripts.
static RUNBOOKS: &[Runbook] = &[
    Runbook {
        label: "PRINT_SPOOLER_STALLED",
        description: "Restart Print Spooler & gather diagnostics",
        risk: RiskLevel::Low,
        actions: &[
            RunbookAction::RunScript { script_id: 1234, params: &[] },
            RunbookAction::Comment { text: "Runbook executed: print spooler reset + diag." },
        ],
    },
    Runbook {
        label: "DISK_100_UTIL",
        description: "Clean temp files and check heavy IO processes",
        risk: RiskLevel::Low,
        actions: &[
            RunbookAction::RunScript { script_id: 2345, params: &[("CLEAN_TEMP", "1")] },
            RunbookAction::Comment { text: "Temp cleanup and diagnostics triggered." },
        ],
    },
];

pub fn get_runbook(label: &str) -> Option<&'static Runbook> {
    RUNBOOKS.iter().find(|r| r.label.eq_ignore_ascii_case(label.trim()))
}

/// First runbook matching any of the solution's labels.
pub fn runbook_for(solution: &Solution) -> Option<&'static Runbook> {
    solution.labels.iter().find_map(|label| get_runbook(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::triage::fallback_solution;

    #[test]
    fn test_lookup_by_label() {
        let rb = get_runbook("PRINT_SPOOLER_STALLED").unwrap();
        assert_eq!(rb.risk, RiskLevel::Low);
        assert_eq!(rb.actions.len(), 2);
        assert!(get_runbook("print_spooler_stalled").is_some());
        assert!(get_runbook("OTHER").is_none());
    }

    #[test]
    fn test_runbook_for_solution() {
        let mut solution = fallback_solution("Disk at 100%");
        assert_eq!(runbook_for(&solution).unwrap().label, "DISK_100_UTIL");
        solution.labels = vec!["OTHER".into()];
        assert!(runbook_for(&solution).is_none());
    }

    #[test]
    fn test_params_json() {
        let value = RunbookAction::params_json(&[("CLEAN_TEMP", "1")]);
        assert_eq!(value, serde_json::json!({ "CLEAN_TEMP": "1" }));
        assert_eq!(RunbookAction::params_json(&[]), serde_json::json!({}));
    }
}
