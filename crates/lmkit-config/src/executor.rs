use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::UnknownVariant;

/// Environment variable overriding the default cache root
pub const CACHE_DIR_ENV: &str = "LMKIT_CACHE_DIR";

/// Batch execution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum task admissions per rolling minute
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Maximum tasks in flight at once in concurrent mode
    #[serde(default = "default_async_capacity")]
    pub async_capacity: usize,
    /// What to do when a task fails
    #[serde(default)]
    pub error_mode: ErrorMode,
    /// When to draw the progress line
    #[serde(default)]
    pub progress: ProgressMode,
    /// Whether completed outputs are cached on disk
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    /// Cache root; falls back to [`default_cache_dir`]
    #[serde(default)]
    pub cache_directory: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: default_max_requests_per_minute(),
            async_capacity: default_async_capacity(),
            error_mode: ErrorMode::default(),
            progress: ProgressMode::default(),
            cache_enabled: default_cache_enabled(),
            cache_directory: None,
        }
    }
}

impl ExecutorConfig {
    /// Cache directory to use, or `None` when caching is disabled
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        if !self.cache_enabled {
            return None;
        }
        Some(self.cache_directory.clone().unwrap_or_else(default_cache_dir))
    }
}

/// Per-task failure policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// The first failure aborts the batch
    #[default]
    Raise,
    /// Failures become per-task error results
    Ignore,
}

impl ErrorMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raise" => Ok(Self::Raise),
            "ignore" => Ok(Self::Ignore),
            other => Err(UnknownVariant {
                kind: "error mode",
                value: other.to_owned(),
                expected: "raise, ignore",
            }),
        }
    }
}

/// When the progress indicator is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Only for batches larger than the progress threshold
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ProgressMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(UnknownVariant {
                kind: "progress mode",
                value: other.to_owned(),
                expected: "auto, always, never",
            }),
        }
    }
}

/// Default cache root
///
/// `LMKIT_CACHE_DIR` when set, otherwise `<platform cache dir>/lmkit`.
pub fn default_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("lmkit")
}

const fn default_max_requests_per_minute() -> u32 {
    20
}

const fn default_async_capacity() -> usize {
    3
}

const fn default_cache_enabled() -> bool {
    true
}
