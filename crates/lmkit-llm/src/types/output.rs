use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::{AssistantContent, FunctionCall, Message};

/// Key under which adapters keep the raw provider payload in `extra`
pub const HTTP_RESPONSE_KEY: &str = "http_response";

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Result of one completed chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutput {
    /// Identity of the model that produced the output, `<type>/<model>`
    pub model_id: String,
    /// Messages produced by the model
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Monetary cost, when the provider's pricing is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Cache key of the request, set by the executor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_key: Option<String>,
    /// Whether this output was replayed from the cache
    #[serde(default)]
    pub is_cache: bool,
    /// Provider-specific diagnostics
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ChatOutput {
    pub fn new(model_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model_id: model_id.into(),
            messages,
            finish_reason: None,
            usage: None,
            cost: None,
            hash_key: None,
            is_cache: false,
            extra: Map::new(),
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the final assistant message, empty when it is a call request
    pub fn reply(&self) -> &str {
        match self.last_message() {
            Some(Message::Assistant {
                content: AssistantContent::Text(text),
                ..
            }) => text,
            _ => "",
        }
    }

    /// Function call requested by the final message, if any
    pub fn function_call(&self) -> Option<&FunctionCall> {
        match self.last_message() {
            Some(Message::Assistant {
                content: AssistantContent::FunctionCall(call),
                ..
            }) => Some(call),
            _ => None,
        }
    }

    /// Same output, flagged as served from the cache
    #[must_use]
    pub fn into_replayed(mut self) -> Self {
        self.is_cache = true;
        self
    }

    #[must_use]
    pub fn with_raw_response(mut self, body: Value) -> Self {
        self.extra.insert(HTTP_RESPONSE_KEY.to_owned(), body);
        self
    }
}
