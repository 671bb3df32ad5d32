use std::time::Duration;

use async_trait::async_trait;
use lmkit_config::EndpointConfig;
use reqwest::Client;
use serde_json::Value;

use crate::error::LlmError;
use crate::prompt::{Prompt, ensure_messages};
use crate::provider::{Adapter, ChatAdapter};
use crate::retry::RetryPolicy;
use crate::streaming::DeltaStream;
use crate::transport::{HttpRequestSpec, decode_chunks};
use crate::types::{ChatOutput, ChatParameters, Message};

/// Default per-call network timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A model that can complete a conversation
///
/// This is the seam the batch executor depends on.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stable identity, part of every cache key
    fn model_id(&self) -> String;

    /// Base parameters every call starts from
    fn parameters(&self) -> &ChatParameters;

    /// Complete `messages` with the base parameters merged with `overrides`
    async fn complete(&self, messages: &[Message], overrides: &ChatParameters) -> Result<ChatOutput, LlmError>;
}

/// Chat model backed by a provider adapter over HTTP
pub struct HttpChatModel {
    adapter: Adapter,
    client: Client,
    parameters: ChatParameters,
    retry: Option<RetryPolicy>,
    timeout: Duration,
}

impl HttpChatModel {
    /// Model with no base parameters and retries disabled
    ///
    /// `timeout` bounds each non-streaming call and each connection attempt.
    pub fn new(adapter: Adapter, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            adapter,
            client,
            parameters: ChatParameters::default(),
            retry: None,
            timeout,
        })
    }

    /// Build from an endpoint configuration
    pub fn from_config(config: &EndpointConfig) -> Result<Self, LlmError> {
        let adapter = Adapter::from_config(config)?;
        let parameters = ChatParameters::from_map(config.parameters.clone())?;

        Ok(Self::new(adapter, Duration::from_secs(config.timeout_seconds))?
            .with_parameters(parameters)
            .with_retry(RetryPolicy::from_config(&config.retry)?))
    }

    /// Build from a `<type>/<model>` identifier with defaults from the environment
    pub fn from_model_id(model_id: &str) -> Result<Self, LlmError> {
        Self::new(Adapter::from_model_id(model_id)?, DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ChatParameters) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: Option<RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub const fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Normalize `prompt` and complete it
    pub async fn completion(&self, prompt: impl Into<Prompt>, overrides: &ChatParameters) -> Result<ChatOutput, LlmError> {
        let messages = ensure_messages(&prompt.into())?;
        self.complete(&messages, overrides).await
    }

    /// Open a stream for `messages`
    ///
    /// Only the connection is retried; the returned stream never is.
    pub async fn stream(&self, messages: &[Message], overrides: &ChatParameters) -> Result<DeltaStream, LlmError> {
        if !self.adapter.supports_streaming() {
            return Err(LlmError::Unsupported {
                provider: self.model_id(),
                feature: "streaming",
            });
        }

        let parameters = self.effective_parameters(overrides)?;
        let spec = self.adapter.build_stream_request(messages, &parameters)?;

        let response = match &self.retry {
            Some(policy) => policy.run("stream connect", || self.send(&spec, true)).await?,
            None => self.send(&spec, true).await?,
        };

        let chunks = decode_chunks(response.bytes_stream(), self.adapter.transport());
        let adapter = self.adapter.clone();
        Ok(DeltaStream::new(
            self.model_id(),
            chunks,
            Box::new(move |chunk: &Value| adapter.parse_stream_chunk(chunk)),
        ))
    }

    fn effective_parameters(&self, overrides: &ChatParameters) -> Result<ChatParameters, LlmError> {
        let parameters = self.parameters.merge(overrides);
        parameters.validate()?;
        Ok(parameters)
    }

    /// One full non-streaming attempt: send, check status, parse
    async fn complete_once(&self, spec: &HttpRequestSpec) -> Result<ChatOutput, LlmError> {
        let response = self.send(spec, false).await?;
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| LlmError::unexpected(text.clone(), e.to_string()))?;
        self.adapter.parse_response(&body)
    }

    async fn send(&self, spec: &HttpRequestSpec, streaming: bool) -> Result<reqwest::Response, LlmError> {
        let mut builder = self
            .client
            .post(spec.url.clone())
            .headers(spec.headers.clone())
            .json(&spec.body);

        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        if !streaming {
            builder = builder.timeout(self.timeout);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(model_id = %self.model_id(), error = %e, "provider request failed");
            LlmError::Http(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model_id = %self.model_id(), status = %status, "provider returned error");
            return Err(LlmError::Upstream { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    fn model_id(&self) -> String {
        self.adapter.model_id()
    }

    fn parameters(&self) -> &ChatParameters {
        &self.parameters
    }

    async fn complete(&self, messages: &[Message], overrides: &ChatParameters) -> Result<ChatOutput, LlmError> {
        let parameters = self.effective_parameters(overrides)?;
        let spec = self.adapter.build_request(messages, &parameters)?;

        let output = match &self.retry {
            Some(policy) => policy.run("chat completion", || self.complete_once(&spec)).await?,
            None => self.complete_once(&spec).await?,
        };

        tracing::debug!(
            model_id = %output.model_id,
            finish_reason = output.finish_reason.as_deref().unwrap_or_default(),
            "completion finished"
        );
        Ok(output)
    }
}
