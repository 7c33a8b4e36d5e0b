//! Reply/plan alignment.
//!
//! Decides, without another model call, whether a technician's free-text
//! reply already covers the steps of the stored plan. Matching is plain
//! keyword-substring containment: cheap, deterministic, and easy to audit
//! from the logged evidence. It favours recall, so a keyword that happens to
//! appear in unrelated reply text counts as a hit.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{AlignmentResult, StepEvidence};

/// Shortest keyword kept, in characters.
pub const MIN_KEYWORD_LEN: usize = 3;
/// Longest keyword kept, in characters.
pub const MAX_KEYWORD_LEN: usize = 24;
/// Keywords kept per step.
pub const MAX_KEYWORDS_PER_STEP: usize = 40;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9\-./_]+").expect("static regex"))
}

/// Lowercase, collapse whitespace runs to one space, trim.
pub fn normalize(text: &str) -> String {
    whitespace_re()
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Keywords of a single step, deduplicated in first-occurrence order.
pub fn extract_keywords(step: &str) -> Vec<String> {
    let normalized = normalize(step);
    let mut keys: Vec<String> = Vec::new();
    for token in token_re().find_iter(&normalized).map(|m| m.as_str()) {
        let len = token.chars().count();
        if !(MIN_KEYWORD_LEN..=MAX_KEYWORD_LEN).contains(&len) {
            continue;
        }
        if !keys.iter().any(|k| k == token) {
            keys.push(token.to_string());
        }
    }
    keys.truncate(MAX_KEYWORDS_PER_STEP);
    keys
}

/// Hits needed for `step_count` steps: half, rounded down, at least one.
pub fn alignment_threshold(step_count: usize) -> usize {
    (step_count / 2).max(1)
}

/// Compare a technician reply against the plan's steps.
pub fn check_alignment(reply: &str, steps: &[String]) -> AlignmentResult {
    if steps.is_empty() {
        return AlignmentResult {
            aligned: true,
            missing: Vec::new(),
            evidence: Vec::new(),
        };
    }

    let reply = normalize(reply);
    let mut missing = Vec::new();
    let mut evidence = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        match extract_keywords(step)
            .into_iter()
            .find(|k| reply.contains(k.as_str()))
        {
            Some(keyword) => evidence.push(StepEvidence { index, keyword }),
            None => missing.push(index),
        }
    }

    AlignmentResult {
        aligned: evidence.len() >= alignment_threshold(steps.len()),
        missing,
        evidence,
    }
}
