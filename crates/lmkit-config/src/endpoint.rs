use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::UnknownVariant;

/// Configuration for a single chat endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Provider protocol
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Model (or deployment) name sent to the provider
    pub model: String,
    /// API key; providers fall back to their conventional environment variable
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Per-call network timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Retry policy, `true` for the defaults
    #[serde(default)]
    pub retry: RetryConfig,
    /// System prompt prepended to every conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Base generation parameters
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Azure API version (`api-version` query parameter)
    #[serde(default)]
    pub api_version: Option<String>,
    /// MiniMax group identifier
    #[serde(default)]
    pub group_id: Option<String>,
    /// MiniMax bot name
    #[serde(default)]
    pub bot_name: Option<String>,
}

impl EndpointConfig {
    /// Minimal endpoint for `provider_type` and `model`, everything else defaulted
    pub fn new(provider_type: ProviderType, model: impl Into<String>) -> Self {
        Self {
            provider_type,
            model: model.into(),
            api_key: None,
            base_url: None,
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
            system_prompt: None,
            parameters: serde_json::Map::new(),
            api_version: None,
            group_id: None,
            bot_name: None,
        }
    }
}

/// Supported provider protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI-compatible chat completions
    Openai,
    /// Azure OpenAI deployments
    Azure,
    /// MiniMax Pro chat completions
    MinimaxPro,
}

impl ProviderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Azure => "azure",
            Self::MinimaxPro => "minimax_pro",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::Openai),
            "azure" => Ok(Self::Azure),
            "minimax_pro" => Ok(Self::MinimaxPro),
            other => Err(UnknownVariant {
                kind: "provider type",
                value: other.to_owned(),
                expected: "openai, azure, minimax_pro",
            }),
        }
    }
}

/// Retry setting: a boolean shorthand or an explicit strategy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RetryConfig {
    /// `true` enables the default strategy, `false` disables retries
    Enabled(bool),
    /// Explicit backoff bounds
    Strategy(RetryStrategyConfig),
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl RetryConfig {
    /// Effective strategy, or `None` when retries are off
    pub fn strategy(&self) -> Option<RetryStrategyConfig> {
        match self {
            Self::Enabled(true) => Some(RetryStrategyConfig::default()),
            Self::Enabled(false) => None,
            Self::Strategy(strategy) => Some(strategy.clone()),
        }
    }
}

/// Exponential backoff bounds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryStrategyConfig {
    #[serde(default = "default_min_wait_seconds")]
    pub min_wait_seconds: f64,
    #[serde(default = "default_max_wait_seconds")]
    pub max_wait_seconds: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl RetryStrategyConfig {
    /// Backoff bounds as durations
    ///
    /// # Errors
    ///
    /// Returns a message when a wait is negative, not finite, too large for
    /// a `Duration`, or when `min_wait_seconds > max_wait_seconds`
    pub fn wait_bounds(&self) -> Result<(Duration, Duration), String> {
        let min_wait = Duration::try_from_secs_f64(self.min_wait_seconds)
            .map_err(|e| format!("retry.min_wait_seconds = {}: {e}", self.min_wait_seconds))?;
        let max_wait = Duration::try_from_secs_f64(self.max_wait_seconds)
            .map_err(|e| format!("retry.max_wait_seconds = {}: {e}", self.max_wait_seconds))?;
        if min_wait > max_wait {
            return Err("retry wait bounds must satisfy min_wait_seconds <= max_wait_seconds".to_owned());
        }
        Ok((min_wait, max_wait))
    }
}

impl Default for RetryStrategyConfig {
    fn default() -> Self {
        Self {
            min_wait_seconds: default_min_wait_seconds(),
            max_wait_seconds: default_max_wait_seconds(),
            max_attempts: default_max_attempts(),
        }
    }
}

const fn default_timeout_seconds() -> u64 {
    60
}

const fn default_min_wait_seconds() -> f64 {
    2.0
}

const fn default_max_wait_seconds() -> f64 {
    20.0
}

const fn default_max_attempts() -> u32 {
    3
}
