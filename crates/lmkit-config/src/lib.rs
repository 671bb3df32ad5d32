//! Configuration for lmkit
//!
//! Loaded from a TOML file with `{{ env.VAR }}` placeholder expansion. The
//! cache root default is resolved here, once, and handed to the executor.

#![allow(clippy::must_use_candidate)]

pub mod endpoint;
mod env;
pub mod executor;
mod loader;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

pub use endpoint::*;
pub use executor::*;
pub use telemetry::TelemetryConfig;

/// Top-level lmkit configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Batch execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Chat endpoints keyed by name, in declaration order
    #[serde(default)]
    pub endpoints: IndexMap<String, EndpointConfig>,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl Config {
    /// Look up an endpoint by name, or the first declared one when `name` is `None`
    pub fn endpoint(&self, name: Option<&str>) -> Option<(&str, &EndpointConfig)> {
        match name {
            Some(name) => self.endpoints.get_key_value(name).map(|(k, v)| (k.as_str(), v)),
            None => self.endpoints.first().map(|(k, v)| (k.as_str(), v)),
        }
    }
}

/// A string that does not name any variant of a closed configuration enum
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    /// What was being parsed (e.g. "error mode")
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
    /// Comma-separated accepted values
    pub expected: &'static str,
}
