//! OpenAI-compatible chat completions adapter

use http::header::AUTHORIZATION;
use lmkit_config::{EndpointConfig, ProviderType};
use secrecy::SecretString;
use serde_json::Value;
use url::Url;

use super::{ChatAdapter, bearer, from_body, join_url, resolve_base_url, resolve_secret, to_body};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiToolCall, OpenAiUsage,
};
use crate::transport::{HttpRequestSpec, StreamTransport};
use crate::types::{
    AssistantContent, ChatOutput, ChatParameters, FunctionCall, Message, StreamEvent, ToolCall, Usage,
};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_API_BASE";

/// Terminator payload of an `OpenAI` event stream
const DONE_SENTINEL: &str = "[DONE]";

/// OpenAI-compatible adapter
///
/// The API key is optional so that local compatible servers work without one.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    model: String,
    base_url: Url,
    api_key: Option<SecretString>,
    system_prompt: Option<String>,
}

impl OpenAiAdapter {
    pub fn from_config(config: &EndpointConfig) -> Result<Self, LlmError> {
        Ok(Self {
            model: config.model.clone(),
            base_url: resolve_base_url(config.base_url.as_ref(), BASE_URL_ENV, Some(DEFAULT_BASE_URL))?,
            api_key: resolve_secret(config.api_key.as_ref(), API_KEY_ENV),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn request(&self, messages: &[Message], parameters: &ChatParameters, stream: bool) -> Result<HttpRequestSpec, LlmError> {
        let wire = build_request(&self.model, self.system_prompt.as_deref(), messages, parameters, stream);
        let mut spec = HttpRequestSpec::new(join_url(&self.base_url, "chat/completions")?, to_body(&wire)?);
        if let Some(key) = &self.api_key {
            spec.headers.insert(AUTHORIZATION, bearer(key)?);
        }
        Ok(spec)
    }
}

impl ChatAdapter for OpenAiAdapter {
    fn model_id(&self) -> String {
        format!("{}/{}", ProviderType::Openai, self.model)
    }

    fn transport(&self) -> StreamTransport {
        StreamTransport::ServerSentEvents
    }

    fn build_request(&self, messages: &[Message], parameters: &ChatParameters) -> Result<HttpRequestSpec, LlmError> {
        self.request(messages, parameters, false)
    }

    fn parse_response(&self, body: &Value) -> Result<ChatOutput, LlmError> {
        parse_response(self.model_id(), body)
    }

    fn build_stream_request(
        &self,
        messages: &[Message],
        parameters: &ChatParameters,
    ) -> Result<HttpRequestSpec, LlmError> {
        self.request(messages, parameters, true)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Result<StreamEvent, LlmError> {
        parse_stream_chunk(chunk)
    }
}

/// Build the wire request shared by `OpenAI` and Azure
pub(crate) fn build_request(
    model: &str,
    system_prompt: Option<&str>,
    messages: &[Message],
    parameters: &ChatParameters,
    stream: bool,
) -> OpenAiRequest {
    let mut wire_messages = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt {
        wire_messages.push(to_wire_message(&Message::system(prompt)));
    }
    wire_messages.extend(messages.iter().map(to_wire_message));

    OpenAiRequest {
        model: model.to_owned(),
        messages: wire_messages,
        temperature: parameters.temperature,
        top_p: parameters.top_p,
        max_tokens: parameters.max_tokens,
        stop: parameters.stop.clone(),
        functions: parameters.functions.as_ref().map(|functions| {
            functions
                .iter()
                .map(|f| OpenAiFunction {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    parameters: f.parameters.clone(),
                })
                .collect()
        }),
        stream: stream.then_some(true),
        extra: parameters.extra.clone(),
    }
}

fn to_wire_message(message: &Message) -> OpenAiMessage {
    let mut wire = OpenAiMessage {
        role: message.role().to_string(),
        content: None,
        name: message.name().map(str::to_owned),
        function_call: None,
        tool_calls: None,
        tool_call_id: None,
    };

    match message {
        Message::Assistant {
            content: AssistantContent::FunctionCall(call),
            ..
        } => {
            wire.function_call = Some(to_wire_call(call));
        }
        Message::Assistant {
            content: AssistantContent::ToolCalls(calls),
            ..
        } => {
            wire.tool_calls = Some(
                calls
                    .iter()
                    .map(|call| OpenAiToolCall {
                        id: call.id.clone(),
                        tool_type: "function".to_owned(),
                        function: to_wire_call(&call.function),
                    })
                    .collect(),
            );
        }
        Message::Tool { tool_call_id, .. } => {
            wire.tool_call_id = Some(tool_call_id.clone());
            wire.content = message.text().map(str::to_owned);
        }
        _ => wire.content = message.text().map(str::to_owned),
    }

    wire
}

fn to_wire_call(call: &FunctionCall) -> OpenAiFunctionCall {
    OpenAiFunctionCall {
        name: call.name.clone(),
        arguments: call.arguments.clone(),
    }
}

fn from_wire_call(call: OpenAiFunctionCall) -> FunctionCall {
    FunctionCall::new(call.name, call.arguments)
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Parse a non-streaming response shared by `OpenAI` and Azure
pub(crate) fn parse_response(model_id: String, body: &Value) -> Result<ChatOutput, LlmError> {
    let response: OpenAiResponse = from_body(body)?;
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LlmError::unexpected(body.to_string(), "response has no choices"));
    };

    let message = choice.message;
    let reply = if let Some(calls) = message.tool_calls.filter(|calls| !calls.is_empty()) {
        Message::tool_calls(
            calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    function: from_wire_call(call.function),
                })
                .collect(),
        )
    } else if let Some(call) = message.function_call {
        Message::function_call(from_wire_call(call))
    } else {
        Message::assistant(message.content.unwrap_or_default())
    };

    let mut output = ChatOutput::new(model_id, vec![reply]).with_raw_response(body.clone());
    output.finish_reason = choice.finish_reason;
    output.usage = response.usage.map(Usage::from);
    Ok(output)
}

/// Map one SSE payload to an event
pub(crate) fn parse_stream_chunk(chunk: &Value) -> Result<StreamEvent, LlmError> {
    if chunk.get("data").and_then(Value::as_str) == Some(DONE_SENTINEL) {
        return Ok(StreamEvent::Done);
    }

    let chunk: OpenAiStreamChunk = from_body(chunk)?;
    let usage = chunk.usage.map(Usage::from);
    let Some(choice) = chunk.choices.into_iter().next() else {
        // usage-only chunk
        return Ok(StreamEvent::text(""));
    };

    let delta = choice.delta.content.unwrap_or_default();
    Ok(match choice.finish_reason {
        Some(reason) => StreamEvent::Finish {
            delta,
            finish_reason: Some(reason),
            usage,
            cost: None,
        },
        None => StreamEvent::text(delta),
    })
}
