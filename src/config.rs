use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://us2.ninjarmm.com";
const DEFAULT_AUTH_URL: &str = "https://us2.ninjarmm.com/oauth/token";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Runtime settings, resolved once at startup from the process environment
/// (after `.env` has been loaded by `main`).
#[derive(Debug, Clone)]
pub struct Settings {
    // NinjaOne region / API
    pub ninja_base_url: String,
    pub ninja_auth_url: String,

    // OAuth client credentials
    pub ninja_client_id: String,
    pub ninja_client_secret: String,
    pub ninja_scope: String,

    /// `None` means open mode: webhook signatures are not checked.
    pub webhook_secret: Option<String>,

    pub allow_autofix: bool,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_output_tokens: u32,

    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Tests use this to avoid
    /// touching the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let max_tokens = match get("OPENAI_MAX_OUTPUT_TOKENS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                AppError::Config(format!("OPENAI_MAX_OUTPUT_TOKENS must be an integer, got '{raw}'"))
            })?,
            None => 800,
        };

        let bind_raw = get_or("AGENT_BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| AppError::Config(format!("AGENT_BIND_ADDR is not a socket address: '{bind_raw}'")))?;

        Ok(Self {
            ninja_base_url: get_or("NINJA_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            ninja_auth_url: get_or("NINJA_AUTH_URL", DEFAULT_AUTH_URL)
                .trim_end_matches('/')
                .to_string(),
            ninja_client_id: get("NINJA_CLIENT_ID").unwrap_or_default(),
            ninja_client_secret: get("NINJA_CLIENT_SECRET").unwrap_or_default(),
            ninja_scope: get_or("NINJA_SCOPE", "public-api"),
            webhook_secret: get("NINJA_WEBHOOK_SECRET"),
            allow_autofix: env_bool(get("AGENT_ALLOW_AUTOFIX").as_deref(), false),
            log_level: get_or("LOG_LEVEL", "info").to_lowercase(),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            openai_model: get_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_max_output_tokens: max_tokens,
            db_path: PathBuf::from(get_or("AGENT_DB_PATH", "agent_state.sqlite3")),
            bind_addr,
        })
    }
}

/// Interpret a boolean flag. Unrecognized values fall back to `default`.
pub fn env_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "y") => true,
        Some("0" | "false" | "no" | "n") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, AppError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings_from(&[]).unwrap();
        assert_eq!(s.ninja_base_url, "https://us2.ninjarmm.com");
        assert_eq!(s.ninja_scope, "public-api");
        assert!(s.webhook_secret.is_none());
        assert!(!s.allow_autofix);
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.openai_max_output_tokens, 800);
        assert_eq!(s.db_path, PathBuf::from("agent_state.sqlite3"));
        assert_eq!(s.bind_addr.port(), 8080);
    }

    #[test]
    fn test_trailing_slash_and_blank_secret() {
        let s = settings_from(&[
            ("NINJA_BASE_URL", "https://eu.ninjarmm.com/"),
            ("NINJA_WEBHOOK_SECRET", "   "),
            ("AGENT_ALLOW_AUTOFIX", "Yes"),
        ])
        .unwrap();
        assert_eq!(s.ninja_base_url, "https://eu.ninjarmm.com");
        assert!(s.webhook_secret.is_none());
        assert!(s.allow_autofix);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = settings_from(&[("OPENAI_MAX_OUTPUT_TOKENS", "lots")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        let err = settings_from(&[("AGENT_BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_env_bool() {
        assert!(env_bool(Some("1"), false));
        assert!(!env_bool(Some("n"), true));
        assert!(env_bool(Some("maybe"), true));
        assert!(!env_bool(None, false));
    }
}
