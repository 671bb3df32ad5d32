//! Azure `OpenAI` deployments adapter

use http::HeaderName;
use lmkit_config::{EndpointConfig, ProviderType};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use super::{ChatAdapter, join_url, openai, require_secret, resolve_base_url, secret_header, to_body};
use crate::error::LlmError;
use crate::transport::HttpRequestSpec;
use crate::types::{ChatOutput, ChatParameters, Message, StreamEvent};

const API_KEY_ENV: &str = "AZURE_API_KEY";
const BASE_URL_ENV: &str = "AZURE_API_BASE";
const API_VERSION_ENV: &str = "AZURE_API_VERSION";

const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Azure speaks the `OpenAI` wire format on a per-deployment URL
///
/// Streaming is not offered.
#[derive(Debug, Clone)]
pub struct AzureAdapter {
    deployment: String,
    base_url: Url,
    api_key: SecretString,
    api_version: String,
    system_prompt: Option<String>,
}

impl AzureAdapter {
    pub fn from_config(config: &EndpointConfig) -> Result<Self, LlmError> {
        let api_version = config
            .api_version
            .clone()
            .or_else(|| super::env_value(API_VERSION_ENV))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned());

        Ok(Self {
            deployment: config.model.clone(),
            base_url: resolve_base_url(config.base_url.as_ref(), BASE_URL_ENV, None)?,
            api_key: require_secret(config.api_key.as_ref(), API_KEY_ENV, ProviderType::Azure)?,
            api_version,
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn unsupported_stream(&self) -> LlmError {
        LlmError::Unsupported {
            provider: self.model_id(),
            feature: "streaming",
        }
    }
}

impl ChatAdapter for AzureAdapter {
    fn model_id(&self) -> String {
        format!("{}/{}", ProviderType::Azure, self.deployment)
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn build_request(&self, messages: &[Message], parameters: &ChatParameters) -> Result<HttpRequestSpec, LlmError> {
        let wire = openai::build_request(&self.deployment, self.system_prompt.as_deref(), messages, parameters, false);
        let url = join_url(
            &self.base_url,
            &format!("openai/deployments/{}/chat/completions", self.deployment),
        )?;

        let mut spec = HttpRequestSpec::new(url, to_body(&wire)?);
        spec.query.push(("api-version".to_owned(), self.api_version.clone()));
        spec.headers.insert(
            HeaderName::from_static("api-key"),
            secret_header(self.api_key.expose_secret())?,
        );
        Ok(spec)
    }

    fn parse_response(&self, body: &Value) -> Result<ChatOutput, LlmError> {
        openai::parse_response(self.model_id(), body)
    }

    fn build_stream_request(&self, _: &[Message], _: &ChatParameters) -> Result<HttpRequestSpec, LlmError> {
        Err(self.unsupported_stream())
    }

    fn parse_stream_chunk(&self, _: &Value) -> Result<StreamEvent, LlmError> {
        Err(self.unsupported_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EndpointConfig {
        let mut config = EndpointConfig::new(ProviderType::Azure, "gpt35");
        config.base_url = Some(Url::parse("https://example.openai.azure.com").unwrap());
        config.api_key = Some(SecretString::from("az-key".to_owned()));
        config.api_version = Some("2023-05-15".to_owned());
        config
    }

    #[test]
    fn request_targets_deployment_with_api_key_header() {
        let adapter = AzureAdapter::from_config(&config()).unwrap();
        let spec = adapter.build_request(&[Message::user("hi")], &ChatParameters::default()).unwrap();

        assert_eq!(
            spec.url.as_str(),
            "https://example.openai.azure.com/openai/deployments/gpt35/chat/completions"
        );
        assert_eq!(spec.query, vec![("api-version".to_owned(), "2023-05-15".to_owned())]);
        assert_eq!(spec.headers["api-key"], "az-key");
    }

    #[test]
    fn streaming_is_unsupported() {
        let adapter = AzureAdapter::from_config(&config()).unwrap();
        assert!(!adapter.supports_streaming());
        let err = adapter
            .build_stream_request(&[Message::user("hi")], &ChatParameters::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::Unsupported { feature: "streaming", .. }));
    }

    #[test]
    fn missing_key_is_reported() {
        temp_env::with_var_unset(API_KEY_ENV, || {
            let mut config = config();
            config.api_key = None;
            let err = AzureAdapter::from_config(&config).unwrap_err();
            assert!(matches!(err, LlmError::MissingCredential { env_var: API_KEY_ENV, .. }));
        });
    }
}
