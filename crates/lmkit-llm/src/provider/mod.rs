//! Provider adapters: normalized request/response to and from vendor HTTP shapes

pub mod azure;
pub mod minimax_pro;
pub mod openai;

use http::HeaderValue;
use lmkit_config::{EndpointConfig, ProviderType};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

pub use self::azure::AzureAdapter;
pub use self::minimax_pro::MinimaxProAdapter;
pub use self::openai::OpenAiAdapter;
use crate::error::LlmError;
use crate::transport::{HttpRequestSpec, StreamTransport};
use crate::types::{ChatOutput, ChatParameters, Message, StreamEvent};

/// Per-vendor translation between normalized types and HTTP payloads
///
/// Implementations are pure: they never perform I/O and never inspect
/// another provider's fields.
pub trait ChatAdapter: Send + Sync {
    /// Stable identity, `<type>/<model>`
    fn model_id(&self) -> String;

    /// Framing of the streaming body
    fn transport(&self) -> StreamTransport {
        StreamTransport::ServerSentEvents
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn build_request(&self, messages: &[Message], parameters: &ChatParameters) -> Result<HttpRequestSpec, LlmError>;

    fn parse_response(&self, body: &Value) -> Result<ChatOutput, LlmError>;

    fn build_stream_request(
        &self,
        messages: &[Message],
        parameters: &ChatParameters,
    ) -> Result<HttpRequestSpec, LlmError>;

    fn parse_stream_chunk(&self, chunk: &Value) -> Result<StreamEvent, LlmError>;
}

/// Closed set of supported providers
#[derive(Debug, Clone)]
pub enum Adapter {
    OpenAi(OpenAiAdapter),
    Azure(AzureAdapter),
    MinimaxPro(MinimaxProAdapter),
}

impl Adapter {
    /// Build the adapter for an endpoint
    pub fn from_config(config: &EndpointConfig) -> Result<Self, LlmError> {
        Ok(match config.provider_type {
            ProviderType::Openai => Self::OpenAi(OpenAiAdapter::from_config(config)?),
            ProviderType::Azure => Self::Azure(AzureAdapter::from_config(config)?),
            ProviderType::MinimaxPro => Self::MinimaxPro(MinimaxProAdapter::from_config(config)?),
        })
    }

    /// Build an adapter from a `<type>/<model>` identifier
    ///
    /// Credentials and base URLs come from the environment.
    pub fn from_model_id(model_id: &str) -> Result<Self, LlmError> {
        let Some((provider, model)) = model_id.split_once('/') else {
            return Err(LlmError::Configuration(format!(
                "model id '{model_id}' must look like '<type>/<model>'"
            )));
        };
        let provider_type = provider
            .parse::<ProviderType>()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Self::from_config(&EndpointConfig::new(provider_type, model))
    }

    pub const fn provider_type(&self) -> ProviderType {
        match self {
            Self::OpenAi(_) => ProviderType::Openai,
            Self::Azure(_) => ProviderType::Azure,
            Self::MinimaxPro(_) => ProviderType::MinimaxPro,
        }
    }

    fn inner(&self) -> &dyn ChatAdapter {
        match self {
            Self::OpenAi(adapter) => adapter,
            Self::Azure(adapter) => adapter,
            Self::MinimaxPro(adapter) => adapter,
        }
    }
}

impl ChatAdapter for Adapter {
    fn model_id(&self) -> String {
        self.inner().model_id()
    }

    fn transport(&self) -> StreamTransport {
        self.inner().transport()
    }

    fn supports_streaming(&self) -> bool {
        self.inner().supports_streaming()
    }

    fn build_request(&self, messages: &[Message], parameters: &ChatParameters) -> Result<HttpRequestSpec, LlmError> {
        self.inner().build_request(messages, parameters)
    }

    fn parse_response(&self, body: &Value) -> Result<ChatOutput, LlmError> {
        self.inner().parse_response(body)
    }

    fn build_stream_request(
        &self,
        messages: &[Message],
        parameters: &ChatParameters,
    ) -> Result<HttpRequestSpec, LlmError> {
        self.inner().build_stream_request(messages, parameters)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Result<StreamEvent, LlmError> {
        self.inner().parse_stream_chunk(chunk)
    }
}

/// Configured secret, else a non-empty environment variable
fn resolve_secret(configured: Option<&SecretString>, env_var: &str) -> Option<SecretString> {
    configured
        .cloned()
        .or_else(|| env_value(env_var).map(SecretString::from))
}

fn require_secret(
    configured: Option<&SecretString>,
    env_var: &'static str,
    provider: ProviderType,
) -> Result<SecretString, LlmError> {
    resolve_secret(configured, env_var).ok_or_else(|| LlmError::MissingCredential {
        provider: provider.to_string(),
        env_var,
    })
}

fn env_value(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}

/// Configured URL, else the environment variable, else `default`
fn resolve_base_url(configured: Option<&Url>, env_var: &'static str, default: Option<&str>) -> Result<Url, LlmError> {
    if let Some(url) = configured {
        return Ok(url.clone());
    }
    let raw = env_value(env_var)
        .or_else(|| default.map(str::to_owned))
        .ok_or_else(|| LlmError::Configuration(format!("no base URL configured and {env_var} is not set")))?;
    Url::parse(&raw).map_err(|e| LlmError::Configuration(format!("invalid base URL '{raw}': {e}")))
}

/// Append `path` to `base`, keeping any path prefix on the base
fn join_url(base: &Url, path: &str) -> Result<Url, LlmError> {
    let base = base.as_str().trim_end_matches('/');
    let joined = format!("{base}/{}", path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| LlmError::Configuration(format!("invalid request URL '{joined}': {e}")))
}

fn secret_header(value: &str) -> Result<HeaderValue, LlmError> {
    let mut header =
        HeaderValue::from_str(value).map_err(|_| LlmError::Configuration("credential is not a valid header value".to_owned()))?;
    header.set_sensitive(true);
    Ok(header)
}

fn bearer(key: &SecretString) -> Result<HeaderValue, LlmError> {
    secret_header(&format!("Bearer {}", key.expose_secret()))
}

/// Serialize a wire request into the JSON body
fn to_body<T: serde::Serialize>(request: &T) -> Result<Value, LlmError> {
    serde_json::to_value(request).map_err(|e| LlmError::InvalidParameters(e.to_string()))
}

/// Deserialize a provider payload, keeping the raw text on failure
fn from_body<T: serde::de::DeserializeOwned>(body: &Value) -> Result<T, LlmError> {
    T::deserialize(body).map_err(|e| LlmError::unexpected(body.to_string(), e.to_string()))
}
