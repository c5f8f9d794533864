//! Runtime configuration for the runner.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (`--model`, `--max-rounds`)
//! 2. Environment variables (`OPENROUTER_API_KEY`, `OPENROUTER_MODEL`)
//! 3. `.env` entries (setdefault semantics — never override existing env)
//! 4. Built-in defaults

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RunnerError;

/// OpenRouter chat-completions endpoint.
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// Default model when neither flag nor env specifies one.
pub const DEFAULT_MODEL: &str = "anthropic/claude-opus-4.6";
/// Request-level retry ceiling for the generation client.
pub const DEFAULT_RETRIES: u32 = 3;
/// Per-request network timeout, seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;
/// Default restoration round budget.
pub const DEFAULT_MAX_ROUNDS: u32 = 2;

const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
const ENV_MODEL: &str = "OPENROUTER_MODEL";

/// Resolved runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// OpenRouter API key (required).
    pub api_key: String,
    /// Model identifier, e.g. `anthropic/claude-opus-4.6`.
    pub model: String,
    /// Chat-completions endpoint URL.
    pub base_url: String,
    /// Request-level retry ceiling.
    pub retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum restoration rounds before the loop gives up.
    pub max_rounds: u32,
}

impl RunnerConfig {
    /// Build from environment, falling back to defaults.
    ///
    /// `model_override` wins over `OPENROUTER_MODEL`.
    pub fn from_env(model_override: Option<&str>) -> Self {
        let model = model_override
            .map(String::from)
            .or_else(|| env::var(ENV_MODEL).ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            api_key: env::var(ENV_API_KEY).unwrap_or_default().trim().to_string(),
            model,
            base_url: OPENROUTER_URL.to_string(),
            retries: DEFAULT_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Validate the config; terminal `Configuration` error if invalid.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.api_key.is_empty() {
            return Err(RunnerError::Configuration(format!(
                "{ENV_API_KEY} is missing. Set it in .env or environment."
            )));
        }
        if self.model.is_empty() {
            return Err(RunnerError::Configuration("model id is empty".into()));
        }
        if self.retries == 0 {
            return Err(RunnerError::Configuration("retries must be > 0".into()));
        }
        if self.max_rounds == 0 {
            return Err(RunnerError::Configuration("max_rounds must be > 0".into()));
        }
        Ok(())
    }
}

/// Load `KEY=VALUE` lines from a `.env` file into the process environment.
///
/// Existing environment variables are never overridden. Blank lines,
/// `#` comments, and lines without `=` are skipped; single/double quotes
/// around values are stripped. Missing file is not an error.
pub fn load_dotenv(path: &Path) -> Result<(), RunnerError> {
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .to_string();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }
        env::set_var(key, value);
    }
    Ok(())
}
