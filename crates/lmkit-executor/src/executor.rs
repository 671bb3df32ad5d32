use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use lmkit_cache::{ResultCache, compute_cache_key};
use lmkit_config::{ErrorMode, ExecutorConfig, ProgressMode};
use lmkit_llm::{ChatModel, ChatOutput, ChatParameters, LlmError, Prompt, ensure_messages};
use lmkit_ratelimit::{DEFAULT_WINDOW, RateGate};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::ExecutorError;
use crate::progress::Progress;
use crate::result::TaskResult;

/// Hook turning a completed output into a task's parsed value
pub type Postprocess =
    Box<dyn Fn(&ChatOutput) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Batch executor over one chat model
///
/// Applies, per task: prompt normalization, cache lookup, concurrency
/// bound, rate gate and the model call. Results always come back in input
/// order.
pub struct Executor {
    model: Arc<dyn ChatModel>,
    overrides: ChatParameters,
    error_mode: ErrorMode,
    progress: ProgressMode,
    async_capacity: usize,
    gate: RateGate,
    cache: Option<ResultCache>,
    postprocess: Option<Postprocess>,
}

impl Executor {
    /// Build an executor, validating options eagerly
    ///
    /// The cache root is taken from `config` (or the default location) when
    /// caching is enabled.
    pub fn new(model: Arc<dyn ChatModel>, config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        Self::with_cache_dir(model, config, config.resolved_cache_dir())
    }

    /// Build an executor with an explicit cache root, `None` disabling the cache
    pub fn with_cache_dir(
        model: Arc<dyn ChatModel>,
        config: &ExecutorConfig,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, ExecutorError> {
        if config.max_requests_per_minute == 0 {
            return Err(ExecutorError::Configuration(
                "max_requests_per_minute must be > 0".to_string(),
            ));
        }
        if config.async_capacity == 0 {
            return Err(ExecutorError::Configuration("async_capacity must be > 0".to_string()));
        }

        let gate = RateGate::new(config.max_requests_per_minute, DEFAULT_WINDOW)?;
        let cache = cache_dir.map(ResultCache::open).transpose()?;

        tracing::debug!(
            model_id = %model.model_id(),
            max_requests_per_minute = config.max_requests_per_minute,
            async_capacity = config.async_capacity,
            error_mode = %config.error_mode,
            cache = cache.is_some(),
            "executor ready"
        );

        Ok(Self {
            model,
            overrides: ChatParameters::default(),
            error_mode: config.error_mode,
            progress: config.progress,
            async_capacity: config.async_capacity,
            gate,
            cache,
            postprocess: None,
        })
    }

    /// Parameters layered over the model's base parameters for every task
    #[must_use]
    pub fn with_parameters(mut self, overrides: ChatParameters) -> Self {
        self.overrides = overrides;
        self
    }

    /// Parse every output, fresh or cached, with `hook`
    ///
    /// A hook failure is a task failure under the configured error mode.
    #[must_use]
    pub fn with_postprocess<F, E>(mut self, hook: F) -> Self
    where
        F: Fn(&ChatOutput) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let postprocess: Postprocess = Box::new(move |output: &ChatOutput| hook(output).map_err(Into::into));
        self.postprocess = Some(postprocess);
        self
    }

    pub const fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    pub const fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Run the batch one task at a time
    pub async fn run<P>(&self, prompts: Vec<P>) -> Result<Vec<TaskResult>, ExecutorError>
    where
        P: Into<Prompt>,
    {
        let prompts: Vec<Prompt> = prompts.into_iter().map(Into::into).collect();
        let progress = self.start_progress(prompts.len());

        let mut results = Vec::with_capacity(prompts.len());
        for (index, prompt) in prompts.iter().enumerate() {
            results.push(self.run_task(index, prompt, &progress).await?);
        }

        progress.finish();
        tracing::debug!(tasks = results.len(), "batch finished");
        Ok(results)
    }

    /// Run the batch with at most `async_capacity` tasks in flight
    ///
    /// Under the raise error mode the first failure cancels the remaining
    /// tasks and is returned as is.
    pub async fn run_concurrent<P>(&self, prompts: Vec<P>) -> Result<Vec<TaskResult>, ExecutorError>
    where
        P: Into<Prompt>,
    {
        let prompts: Vec<Prompt> = prompts.into_iter().map(Into::into).collect();
        let progress = self.start_progress(prompts.len());
        let slots = Semaphore::new(self.async_capacity);

        let tasks = prompts.iter().enumerate().map(|(index, prompt)| {
            let slots = &slots;
            let progress = &progress;
            async move {
                let _permit = slots
                    .acquire()
                    .await
                    .map_err(|e| ExecutorError::Internal(e.to_string()))?;
                self.run_task(index, prompt, progress).await
            }
        });
        let results = try_join_all(tasks).await?;

        progress.finish();
        tracing::debug!(tasks = results.len(), "batch finished");
        Ok(results)
    }

    /// Run the batch sequentially on a private current-thread runtime
    ///
    /// Must not be called from inside an async context.
    pub fn run_blocking<P>(&self, prompts: Vec<P>) -> Result<Vec<TaskResult>, ExecutorError>
    where
        P: Into<Prompt>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(prompts))
    }

    fn start_progress(&self, total: usize) -> Progress {
        tracing::debug!(tasks = total, model_id = %self.model.model_id(), "batch started");
        Progress::new(self.progress, self.model.model_id(), total)
    }

    /// One batch item, with the error mode applied
    async fn run_task(&self, index: usize, prompt: &Prompt, progress: &Progress) -> Result<TaskResult, ExecutorError> {
        let outcome = self.execute(prompt).await;
        progress.advance();

        let output = match outcome {
            Ok(output) => output,
            Err(e) => return self.on_failure(index, e, None),
        };

        let Some(postprocess) = &self.postprocess else {
            return Ok(TaskResult::from(output));
        };
        match postprocess(&output) {
            Ok(parsed) => Ok(TaskResult::Success {
                output,
                parsed: Some(parsed),
            }),
            Err(e) => self.on_failure(index, ExecutorError::Postprocess(e.to_string()), Some(output)),
        }
    }

    fn on_failure(
        &self,
        index: usize,
        error: ExecutorError,
        response: Option<ChatOutput>,
    ) -> Result<TaskResult, ExecutorError> {
        match self.error_mode {
            ErrorMode::Raise => {
                tracing::error!(task = index, error = %error, "task failed, aborting batch");
                Err(error)
            }
            ErrorMode::Ignore => {
                tracing::warn!(task = index, error = %error, "task failed");
                Ok(TaskResult::Failure {
                    error: error.to_string(),
                    response,
                })
            }
        }
    }

    async fn execute(&self, prompt: &Prompt) -> Result<ChatOutput, ExecutorError> {
        let messages = ensure_messages(prompt).map_err(LlmError::from)?;
        let model_id = self.model.model_id();
        let effective = self.model.parameters().merge(&self.overrides);
        let cache_key = compute_cache_key(&model_id, &messages, &effective);

        if let Some(cache) = &self.cache
            && let Some(output) = cache.get(&cache_key).await?
        {
            return Ok(output);
        }

        let waited = self.gate.acquire().await;
        if !waited.is_zero() {
            tracing::debug!(waited_secs = waited.as_secs(), "admitted after rate wait");
        }

        let mut output = self.model.complete(&messages, &self.overrides).await?;
        output.hash_key = Some(cache_key.clone());

        if let Some(cache) = &self.cache {
            cache.set(&cache_key, &output).await?;
        }

        Ok(output)
    }
}
