//! Process-wide configuration, resolved once at startup from environment
//! variables. Grounded on `original_source/mvp/config.py`'s "env var with
//! fallback to a sensible default, logged once" precedent.

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_LLM_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_LLM_MODELS: &str = "gemini-2.0-flash,gemini-1.5-flash";
const DEFAULT_REGISTRY_URL: &str = "localhost:5000";
const DEFAULT_MAX_CONCURRENT_BUILDS: usize = 4;
const DEFAULT_MEMORY_BUFFER_MINUTES: i64 = 5;

pub struct Config {
    pub keychain_service: String,
    pub llm_endpoint: String,
    pub llm_models: String,
    pub registry_url: String,
    pub wasm_registry_root: PathBuf,
    pub memory_db_path: Option<PathBuf>,
    pub memory_buffer_minutes: i64,
    pub max_concurrent_builds: usize,
    pub llm_api_key: Option<String>,
    pub web_search_key: Option<String>,
    pub web_search_cx: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// the documented defaults and logging each fallback exactly once.
    pub fn from_env() -> Self {
        let config = Self {
            keychain_service: env_or_default("HELIX_KEYCHAIN_SERVICE", "helix"),
            llm_endpoint: env_or_default("HELIX_LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT),
            llm_models: env_or_default("HELIX_LLM_MODELS", DEFAULT_LLM_MODELS),
            registry_url: env_or_default("HELIX_REGISTRY_URL", DEFAULT_REGISTRY_URL),
            wasm_registry_root: std::env::var("HELIX_WASM_REGISTRY_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| helix_registry::default_wasm_root()),
            memory_db_path: std::env::var("HELIX_MEMORY_DB_PATH").ok().map(PathBuf::from),
            memory_buffer_minutes: env_parsed_or_default("HELIX_MEMORY_BUFFER_MINUTES", DEFAULT_MEMORY_BUFFER_MINUTES),
            max_concurrent_builds: env_parsed_or_default("HELIX_MAX_CONCURRENT_BUILDS", DEFAULT_MAX_CONCURRENT_BUILDS),
            llm_api_key: non_empty_env(helix_core::env_keys::LLM_API_KEY),
            web_search_key: non_empty_env(helix_core::env_keys::WEB_SEARCH_KEY),
            web_search_cx: non_empty_env(helix_core::env_keys::WEB_SEARCH_CX),
        };

        info!(
            registry_url = %config.registry_url,
            wasm_registry_root = %config.wasm_registry_root.display(),
            max_concurrent_builds = config.max_concurrent_builds,
            "configuration loaded"
        );

        config
    }

    pub fn lifecycle_interval(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            info!(key, default, "using default configuration value");
            default.to_string()
        }
    }
}

fn env_parsed_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
