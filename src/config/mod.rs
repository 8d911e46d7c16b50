//! Runtime configuration, loaded entirely from environment variables.
//!
//! Supported variables:
//! - `DATABASE_URL`: sqlite connection string (default `sqlite://workflow.db`)
//! - `HOST` / `PORT`: bind address for the HTTP server
//! - `WORKFLOW_TASK_TIMEOUT_MS`: per-node remote task timeout
//! - `WORKFLOW_POLL_INTERVAL_MS`: remote task poll interval
//! - `TRIGGER_ENABLED`: `false` routes node execution through
//!   [`crate::executor::remote_task::LocalFallbackTaskRunner`] instead of HTTP
//! - `REMOTE_TASK_BASE_URL`: base URL for the HTTP task runner
//! - `ASSEMBLY_SERVICE_BASE_URL`: base URL for fetching assembly status
//! - `DURABLE_PROVIDER_NAME` / `DURABLE_PROVIDER_API_KEY` / `DURABLE_PROVIDER_UPLOAD_URL`
//! - `DEFAULT_LLM_MODEL` / `DEFAULT_IMAGE_MODEL`

use std::env;
use std::time::Duration;

use crate::assets::persister::ProviderConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub task_timeout: Duration,
    pub poll_interval: Duration,
    pub trigger_enabled: bool,
    pub remote_task_base_url: String,
    pub assembly_base_url: String,
    pub durable_provider: Option<ProviderConfig>,
    pub default_llm_model: String,
    pub default_image_model: String,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes"),
        Err(_) => default,
    }
}

impl Settings {
    /// Builds settings from the process environment. Never fails: every
    /// variable has a sane default, consistent with how the rest of this
    /// crate treats configuration as best-effort rather than load-bearing.
    pub fn from_env() -> Self {
        let durable_provider = env::var("DURABLE_PROVIDER_NAME").ok().map(|name| ProviderConfig {
            name,
            api_key: env_or("DURABLE_PROVIDER_API_KEY", ""),
            upload_url: env_or("DURABLE_PROVIDER_UPLOAD_URL", ""),
        });

        Self {
            database_url: env_or("DATABASE_URL", "sqlite://workflow.db"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080),
            task_timeout: Duration::from_millis(env_parse("WORKFLOW_TASK_TIMEOUT_MS", 120_000)),
            poll_interval: Duration::from_millis(env_parse("WORKFLOW_POLL_INTERVAL_MS", 1_000)),
            trigger_enabled: env_bool("TRIGGER_ENABLED", true),
            remote_task_base_url: env_or("REMOTE_TASK_BASE_URL", "http://localhost:9000"),
            assembly_base_url: env_or("ASSEMBLY_SERVICE_BASE_URL", "https://api2.transloadit.com/assemblies"),
            durable_provider,
            default_llm_model: env_or("DEFAULT_LLM_MODEL", "gpt-4o"),
            default_image_model: env_or("DEFAULT_IMAGE_MODEL", "stable-diffusion-xl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_missing_or_invalid() {
        assert_eq!(env_parse::<u64>("WORKFLOW_DOES_NOT_EXIST", 42), 42);
    }

    #[test]
    fn env_bool_accepts_common_truthy_forms() {
        std::env::set_var("WORKFLOW_CONFIG_TEST_BOOL", "YES");
        assert!(env_bool("WORKFLOW_CONFIG_TEST_BOOL", false));
        std::env::remove_var("WORKFLOW_CONFIG_TEST_BOOL");
    }
}
