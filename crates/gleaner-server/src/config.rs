use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use gleaner_client::fetcher::DEFAULT_USER_AGENT;
use gleaner_client::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use gleaner_core::batch::BatchConfig;
use gleaner_core::error::AppError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_URLS: usize = 500;

/// Server configuration read from `GLEANER_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Defaults for `/v1/batch`; a request may override either knob.
    pub batch: BatchConfig,
    /// Largest URL list a single request may carry.
    pub max_urls: usize,
    pub allow_private_urls: bool,
    pub user_agent: String,
    /// `None` disables `/v1/extract`.
    pub llm: Option<LlmConfig>,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `GLEANER_SERVER_PORT` (default 3000)
    /// - `GLEANER_CONCURRENCY` (default 10), `GLEANER_TIMEOUT_SECS` (default 30)
    /// - `GLEANER_MAX_URLS` (default 500)
    /// - `GLEANER_ALLOW_PRIVATE_URLS` (default false)
    /// - `GLEANER_USER_AGENT`
    /// - `GLEANER_API_KEY`, `GLEANER_MODEL`, `GLEANER_BASE_URL`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = parse_var(&lookup, "GLEANER_SERVER_PORT", DEFAULT_PORT)?;
        let defaults = BatchConfig::default();
        let concurrency = parse_var(&lookup, "GLEANER_CONCURRENCY", defaults.concurrency_limit)?;
        let timeout_secs = parse_var(&lookup, "GLEANER_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        let max_urls = parse_var(&lookup, "GLEANER_MAX_URLS", DEFAULT_MAX_URLS)?;
        let allow_private_urls = parse_flag(&lookup, "GLEANER_ALLOW_PRIVATE_URLS")?;

        if concurrency == 0 {
            return Err(AppError::ConfigError(
                "GLEANER_CONCURRENCY must be at least 1".into(),
            ));
        }
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "GLEANER_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if max_urls == 0 {
            return Err(AppError::ConfigError(
                "GLEANER_MAX_URLS must be at least 1".into(),
            ));
        }

        let llm = non_empty(&lookup, "GLEANER_API_KEY").map(|api_key| LlmConfig {
            api_key,
            model: non_empty(&lookup, "GLEANER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty(&lookup, "GLEANER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        });

        Ok(Self {
            port,
            batch: BatchConfig::new(concurrency, Duration::from_secs(timeout_secs)),
            max_urls,
            allow_private_urls,
            user_agent: non_empty(&lookup, "GLEANER_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            llm,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match non_empty(lookup, name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            AppError::ConfigError(format!("Invalid {name} '{raw}': must be a non-negative integer"))
        }),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<bool, AppError> {
    match non_empty(lookup, name).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(AppError::ConfigError(format!(
            "Invalid {name} '{other}': expected true or false"
        ))),
    }
}
