//! Endpoint and executor configuration pointed at the mock provider

use lmkit_config::{EndpointConfig, ErrorMode, ExecutorConfig, ProgressMode, ProviderType, RetryConfig, RetryStrategyConfig};
use secrecy::SecretString;
use url::Url;

use super::mock_provider::{MOCK_API_KEY, MOCK_GROUP_ID, MockProvider};

pub fn openai_endpoint(mock: &MockProvider) -> EndpointConfig {
    endpoint(ProviderType::Openai, "mock-model-1", &mock.openai_url())
}

pub fn azure_endpoint(mock: &MockProvider) -> EndpointConfig {
    let mut config = endpoint(ProviderType::Azure, "mock-deployment", &mock.azure_url());
    config.api_version = Some("2024-02-01".to_owned());
    config
}

pub fn minimax_endpoint(mock: &MockProvider) -> EndpointConfig {
    let mut config = endpoint(ProviderType::MinimaxPro, "abab5.5-chat", &mock.minimax_url());
    config.group_id = Some(MOCK_GROUP_ID.to_owned());
    config
}

fn endpoint(provider_type: ProviderType, model: &str, base_url: &str) -> EndpointConfig {
    let mut config = EndpointConfig::new(provider_type, model);
    config.base_url = Some(Url::parse(base_url).unwrap());
    config.api_key = Some(SecretString::from(MOCK_API_KEY));
    config.timeout_seconds = 5;
    config
}

/// Retry quickly so tests do not sit in backoff
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::Strategy(RetryStrategyConfig {
        min_wait_seconds: 0.01,
        max_wait_seconds: 0.05,
        max_attempts,
    })
}

pub fn executor_config(error_mode: ErrorMode, async_capacity: usize) -> ExecutorConfig {
    ExecutorConfig {
        max_requests_per_minute: 1000,
        async_capacity,
        error_mode,
        progress: ProgressMode::Never,
        cache_enabled: false,
        cache_directory: None,
    }
}
