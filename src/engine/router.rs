//! Ticket event state machine.
//!
//! Each webhook delivery is one transition. Per-ticket state is implicit:
//! a ticket with a stored solution is `Suggested`, anything else has no
//! solution yet.
//!
//! | event          | condition                                   | phase               |
//! |----------------|---------------------------------------------|---------------------|
//! | other          |                                             | ignored             |
//! | TICKET_CREATED |                                             | `created_suggested` |
//! | TICKET_UPDATED | no reply / non-technician author            | `updated_ignored`   |
//! | TICKET_UPDATED | technician reply, no stored solution        | `updated_seeded`    |
//! | TICKET_UPDATED | stored solution, reply aligned              | `updated_aligned`   |
//! | TICKET_UPDATED | stored solution, not aligned, steps missing | `updated_augmented` |
//! | TICKET_UPDATED | stored solution, not aligned, none missing  | `updated_no_gaps`   |

use std::sync::Arc;

use async_trait::async_trait;

use super::alignment::check_alignment;
use super::notes;
use super::runbooks::{runbook_for, Runbook, RunbookAction};
use super::store::SolutionStore;
use super::triage::{generate_solution, TriageRequester};
use super::types::{EventKind, Outcome, Phase, TicketEvent, TicketState};
use crate::error::AppError;

/// Author roles whose replies are checked against the plan.
pub const TECHNICIAN_ROLES: [&str; 4] = ["TECHNICIAN", "AGENT", "ADMIN", "ENGINEER"];

pub fn is_technician_role(role: &str) -> bool {
    let role = role.trim().to_uppercase();
    TECHNICIAN_ROLES.contains(&role.as_str())
}

/// Upstream ticketing operations the router needs.
#[async_trait]
pub trait TicketingApi: Send + Sync {
    async fn get_device(&self, device_id: i64) -> Result<serde_json::Value, AppError>;

    async fn add_ticket_comment(
        &self,
        ticket_id: i64,
        text: &str,
        is_public: bool,
    ) -> Result<(), AppError>;

    async fn run_script(
        &self,
        device_id: i64,
        script_id: i64,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouterOptions {
    /// Execute the matching runbook after posting a fresh solution.
    pub allow_autofix: bool,
}

pub struct TicketRouter {
    api: Arc<dyn TicketingApi>,
    triage: Arc<dyn TriageRequester>,
    store: Arc<dyn SolutionStore>,
    options: RouterOptions,
}

impl TicketRouter {
    pub fn new(
        api: Arc<dyn TicketingApi>,
        triage: Arc<dyn TriageRequester>,
        store: Arc<dyn SolutionStore>,
        options: RouterOptions,
    ) -> Self {
        Self { api, triage, store, options }
    }

    /// Route one delivery. Never fails: downstream errors are logged and
    /// degraded so the webhook can always be acknowledged.
    pub async fn handle(&self, event: &TicketEvent) -> Outcome {
        let ticket_id = event.ticket_id;
        let phase = match event.kind() {
            EventKind::Other => {
                tracing::info!(event_type = %event.event_type, ticket_id, "Ignoring unrecognized event");
                return Outcome::Ignored(event.event_type.clone());
            }
            EventKind::Created => {
                self.suggest(event, notes::ANALYZING_NOTE).await;
                Phase::CreatedSuggested
            }
            EventKind::Updated => return self.handle_updated(event).await,
        };

        tracing::info!(ticket_id, phase = phase.as_str(), "Ticket event handled");
        Outcome::Handled { ticket_id, phase, missing: Vec::new() }
    }

    async fn handle_updated(&self, event: &TicketEvent) -> Outcome {
        let ticket_id = event.ticket_id;
        let reply = event.last_comment_text.as_deref().unwrap_or("");
        let role = event.last_comment_author_role.as_deref().unwrap_or("");

        let handled = |phase: Phase, missing: Vec<usize>| {
            tracing::info!(ticket_id, phase = phase.as_str(), "Ticket event handled");
            Outcome::Handled { ticket_id, phase, missing }
        };

        if reply.is_empty() || !is_technician_role(role) {
            tracing::debug!(ticket_id, role, "No technician reply to check");
            return handled(Phase::UpdatedIgnored, Vec::new());
        }

        let prior = match self.store.get(ticket_id).await {
            Ok(prior) => prior,
            Err(e) => {
                tracing::error!(ticket_id, error = %e, "Failed reading stored solution, treating as absent");
                None
            }
        };
        let state = if prior.is_some() { TicketState::Suggested } else { TicketState::NoSolution };
        tracing::debug!(ticket_id, state = state.as_str(), "Ticket state resolved");

        let Some(prior) = prior else {
            self.suggest(event, notes::SEEDING_NOTE).await;
            return handled(Phase::UpdatedSeeded, Vec::new());
        };

        let steps = &prior.solution_steps;
        let result = check_alignment(reply, steps);
        tracing::debug!(
            ticket_id,
            aligned = result.aligned,
            evidence = ?result.evidence,
            missing = ?result.missing,
            "Alignment checked"
        );

        if result.aligned {
            return handled(Phase::UpdatedAligned, Vec::new());
        }

        let missing_steps: Vec<&str> = result
            .missing
            .iter()
            .filter_map(|&i| steps.get(i).map(String::as_str))
            .collect();
        if missing_steps.is_empty() {
            return handled(Phase::UpdatedNoGaps, Vec::new());
        }

        self.post_internal_note(ticket_id, &notes::format_missing_steps_note(missing_steps))
            .await;
        handled(Phase::UpdatedAugmented, result.missing)
    }

    /// Generate, persist, and post a fresh solution.
    async fn suggest(&self, event: &TicketEvent, preface: &str) {
        let ticket_id = event.ticket_id;
        self.post_internal_note(ticket_id, preface).await;

        let facts = self.device_facts(event).await;
        let solution = generate_solution(self.triage.as_ref(), &event.ticket_text(), &facts).await;

        if let Err(e) = self.store.save(ticket_id, &solution).await {
            tracing::error!(ticket_id, error = %e, "Failed persisting solution");
        }

        let runbook = runbook_for(&solution);
        let note = notes::format_solution_note(&solution, runbook, self.triage.source_name());
        self.post_internal_note(ticket_id, &note).await;

        if let Some(rb) = runbook.filter(|_| self.options.allow_autofix) {
            self.execute_runbook(event, rb).await;
        }
    }

    /// Best-effort device facts. Failures degrade to an empty object plus a note.
    async fn device_facts(&self, event: &TicketEvent) -> serde_json::Value {
        let empty = serde_json::Value::Object(serde_json::Map::new());
        let Some(device_id) = event.device() else {
            return empty;
        };

        match self.api.get_device(device_id).await {
            Ok(facts) => facts,
            Err(e) => {
                tracing::warn!(ticket_id = event.ticket_id, device_id, error = %e, "Device facts unavailable");
                self.post_internal_note(event.ticket_id, &notes::device_facts_error_note(&e))
                    .await;
                empty
            }
        }
    }

    async fn execute_runbook(&self, event: &TicketEvent, runbook: &Runbook) {
        let ticket_id = event.ticket_id;
        tracing::info!(ticket_id, runbook = runbook.label, "Executing runbook");

        for action in runbook.actions {
            match action {
                RunbookAction::RunScript { script_id, params } => {
                    let Some(device_id) = event.device() else {
                        tracing::info!(ticket_id, script_id, "No device on ticket, skipping runbook script");
                        continue;
                    };
                    let params = RunbookAction::params_json(params);
                    if let Err(e) = self.api.run_script(device_id, *script_id, params).await {
                        tracing::error!(ticket_id, device_id, script_id, error = %e, "Runbook script failed");
                    }
                }
                RunbookAction::Comment { text } => self.post_internal_note(ticket_id, text).await,
            }
        }
    }

    /// Post a private note. Failures are logged and swallowed.
    async fn post_internal_note(&self, ticket_id: i64, text: &str) {
        if let Err(e) = self.api.add_ticket_comment(ticket_id, text, false).await {
            tracing::error!(ticket_id, error = %e, "Failed posting internal note");
        }
    }
}
