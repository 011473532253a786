//! Client configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the API base URL.
pub const URL_ENV: &str = "CENTRI_HOST";
/// Environment variable holding the API key.
pub const KEY_ENV: &str = "CENTRI_KEY";

/// Client configuration.
///
/// Loaded from a JSON5 file; `${ENV_VAR}` references in the file are
/// substituted before parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Server API base URL, e.g. `http://localhost:8000/api`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of an environment variable to read the API key from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Request timeout. Unset means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub invalid_json: InvalidJsonPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// What to do when a 2xx response body is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidJsonPolicy {
    /// Fail the call with a decode error.
    #[default]
    Fail,
    /// Log a warning and treat the response as an empty result.
    Empty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "centri_agent=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// A value that is set and not empty. `${VAR}` substitution turns a missing
/// variable into `""`, which counts as unset.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn env_value(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok().as_deref())
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"\$\{([^}]+)\}").expect("env substitution pattern is valid")
    });
    re.replace_all(input, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

impl AgentConfig {
    /// Load config from a JSON5 file. A missing file yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        json5::from_str(&substituted).map_err(|e| Error::Config(e.to_string()))
    }

    /// Config taken only from `CENTRI_HOST` / `CENTRI_KEY`.
    pub fn from_env() -> Self {
        Self {
            url: env_value(URL_ENV),
            api_key_env: Some(KEY_ENV.into()),
            ..Default::default()
        }
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".centri_agent")
            .join("config.json")
    }

    /// Base URL: the `url` field, then `CENTRI_HOST`.
    pub fn resolve_url(&self) -> Option<String> {
        non_empty(self.url.as_deref()).or_else(|| env_value(URL_ENV))
    }

    /// API key: `api_key`, then the `api_key_env` variable, then `CENTRI_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        non_empty(self.api_key.as_deref())
            .or_else(|| self.api_key_env.as_deref().and_then(env_value))
            .or_else(|| env_value(KEY_ENV))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Check that a usable URL and key can be resolved.
    pub fn validate(&self) -> Result<()> {
        let url = self
            .resolve_url()
            .ok_or_else(|| Error::Config(format!("no API url (set `url` or {URL_ENV})")))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!("API url must be http(s): {url}")));
        }
        if self.resolve_api_key().is_none() {
            return Err(Error::Config(format!(
                "no API key (set `api_key`, `api_key_env`, or {KEY_ENV})"
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
