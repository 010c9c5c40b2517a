//! Runtime configuration from the environment

use crate::llm::{LlmConfig, DEFAULT_BASE_URL};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    pub llm: LlmConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and unparsable values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("LAUNCHPAD_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".launchpad").join("launchpad.db")
            },
            PathBuf::from,
        );

        let log_json = lookup("LAUNCHPAD_LOG_JSON")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let llm = LlmConfig {
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            base_url: Some(
                lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ),
            model: lookup("LAUNCHPAD_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: lookup("LAUNCHPAD_MAX_TOKENS").and_then(|v| v.trim().parse().ok()),
        };

        Self {
            db_path,
            log_json,
            llm,
        }
    }
}
