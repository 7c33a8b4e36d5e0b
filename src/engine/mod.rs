pub mod alignment;
pub mod notes;
pub mod router;
pub mod runbooks;
pub mod signature;
pub mod store;
pub mod triage;
pub mod types;
pub mod webhook;

#[cfg(test)]
pub mod test_support;
