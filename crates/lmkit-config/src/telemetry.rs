use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `tracing` filter directive (e.g. `"info,lmkit_llm=debug"`)
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Emit JSON log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}
