use lmkit_cache::CacheError;
use lmkit_config::UnknownVariant;
use lmkit_llm::LlmError;
use lmkit_ratelimit::RateLimitError;
use thiserror::Error;

/// Batch execution errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Rejected executor options, raised at construction
    #[error("executor configuration error: {0}")]
    Configuration(String),

    /// A task failed under the raise error mode
    #[error(transparent)]
    Task(#[from] LlmError),

    /// The result cache could not be opened, read or written
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The postprocess hook rejected an output
    #[error("postprocess failed: {0}")]
    Postprocess(String),

    /// The blocking runtime could not be started
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// Concurrency limiter shut down mid-batch
    #[error("executor internal error: {0}")]
    Internal(String),
}

impl From<UnknownVariant> for ExecutorError {
    fn from(err: UnknownVariant) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<RateLimitError> for ExecutorError {
    fn from(err: RateLimitError) -> Self {
        Self::Configuration(err.to_string())
    }
}
