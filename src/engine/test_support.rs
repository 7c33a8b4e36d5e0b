//! In-memory collaborators for router and webhook tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::router::TicketingApi;
use super::store::SolutionStore;
use super::triage::{TriageRequest, TriageRequester};
use super::types::Solution;
use crate::error::AppError;

/// Records every note and script call. `device == None` makes device fetches fail.
#[derive(Default)]
pub struct MockApi {
    device: Option<serde_json::Value>,
    fail_notes: bool,
    notes: Mutex<Vec<(i64, String, bool)>>,
    scripts: Mutex<Vec<(i64, i64, serde_json::Value)>>,
}

impl MockApi {
    pub fn with_device(facts: serde_json::Value) -> Self {
        Self { device: Some(facts), ..Default::default() }
    }

    pub fn failing_notes() -> Self {
        Self { fail_notes: true, ..Default::default() }
    }

    pub fn notes(&self) -> Vec<(i64, String, bool)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn scripts(&self) -> Vec<(i64, i64, serde_json::Value)> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketingApi for MockApi {
    async fn get_device(&self, device_id: i64) -> Result<serde_json::Value, AppError> {
        self.device
            .clone()
            .ok_or_else(|| AppError::Ninja(format!("device {device_id} unreachable")))
    }

    async fn add_ticket_comment(
        &self,
        ticket_id: i64,
        text: &str,
        is_public: bool,
    ) -> Result<(), AppError> {
        if self.fail_notes {
            return Err(AppError::Ninja("comment endpoint down".into()));
        }
        self.notes.lock().unwrap().push((ticket_id, text.to_string(), is_public));
        Ok(())
    }

    async fn run_script(
        &self,
        device_id: i64,
        script_id: i64,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        self.scripts.lock().unwrap().push((device_id, script_id, params));
        Ok(serde_json::json!({}))
    }
}

/// Returns a fixed solution, or fails when constructed with `failing()`.
pub struct MockTriage {
    answer: Option<Solution>,
    last: Mutex<Option<TriageRequest>>,
}

impl MockTriage {
    pub fn answering(solution: Solution) -> Self {
        Self { answer: Some(solution), last: Mutex::new(None) }
    }

    pub fn failing() -> Self {
        Self { answer: None, last: Mutex::new(None) }
    }

    pub fn last_request(&self) -> Option<TriageRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl TriageRequester for MockTriage {
    async fn request(&self, request: &TriageRequest) -> Result<Solution, AppError> {
        *self.last.lock().unwrap() = Some(request.clone());
        self.answer
            .clone()
            .ok_or_else(|| AppError::Llm("model unavailable".into()))
    }

    fn source_name(&self) -> &str {
        "mock-model"
    }
}

#[derive(Default)]
pub struct MemoryStore {
    fail: bool,
    map: Mutex<HashMap<i64, Solution>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SolutionStore for MemoryStore {
    async fn get(&self, ticket_id: i64) -> Result<Option<Solution>, AppError> {
        if self.fail {
            return Err(AppError::Internal("store offline".into()));
        }
        Ok(self.map.lock().unwrap().get(&ticket_id).cloned())
    }

    async fn save(&self, ticket_id: i64, solution: &Solution) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Internal("store offline".into()));
        }
        self.map.lock().unwrap().insert(ticket_id, solution.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
