use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config = Self::parse(&raw)?;
        tracing::debug!(path = %path.display(), endpoints = config.endpoints.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is configured or a numeric setting
    /// is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_executor()?;
        self.validate_endpoints()?;
        Ok(())
    }

    fn validate_executor(&self) -> anyhow::Result<()> {
        if self.executor.max_requests_per_minute == 0 {
            anyhow::bail!("executor.max_requests_per_minute must be greater than 0");
        }
        if self.executor.async_capacity == 0 {
            anyhow::bail!("executor.async_capacity must be greater than 0");
        }
        Ok(())
    }

    fn validate_endpoints(&self) -> anyhow::Result<()> {
        if self.endpoints.is_empty() {
            anyhow::bail!("at least one endpoint must be configured");
        }

        for (name, endpoint) in &self.endpoints {
            if endpoint.model.trim().is_empty() {
                anyhow::bail!("endpoint '{name}' has an empty model");
            }
            if endpoint.timeout_seconds == 0 {
                anyhow::bail!("endpoint '{name}' timeout_seconds must be greater than 0");
            }
            if let Some(strategy) = endpoint.retry.strategy() {
                if strategy.max_attempts == 0 {
                    anyhow::bail!("endpoint '{name}' retry.max_attempts must be at least 1");
                }
                if let Err(e) = strategy.wait_bounds() {
                    anyhow::bail!("endpoint '{name}' {e}");
                }
            }
        }

        Ok(())
    }
}
