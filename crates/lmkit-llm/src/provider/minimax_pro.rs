//! MiniMax Pro chat completions adapter

use http::header::AUTHORIZATION;
use lmkit_config::{EndpointConfig, ProviderType};
use secrecy::SecretString;
use serde_json::Value;
use url::Url;

use super::{ChatAdapter, bearer, from_body, require_secret, resolve_base_url, to_body};
use crate::error::{LlmError, MessageError};
use crate::protocol::minimax::{
    BotSetting, DEFAULT_BOT_CONTENT, DEFAULT_BOT_NAME, DEFAULT_USER_NAME, MinimaxFunctionCall, MinimaxProMessage,
    MinimaxProRequest, MinimaxProResponse, ReplyConstraints, SenderType, WEB_SEARCH_SENDER,
};
use crate::protocol::openai::OpenAiFunction;
use crate::transport::{HttpRequestSpec, StreamTransport};
use crate::types::{
    AssistantContent, ChatOutput, ChatParameters, FunctionCall, Message, StreamEvent, Usage, ZERO_SAMPLING_FLOOR,
};

const DEFAULT_BASE_URL: &str = "https://api.minimax.chat/v1/text/chatcompletion_pro";

const API_KEY_ENV: &str = "MINIMAX_API_KEY";
const GROUP_ID_ENV: &str = "MINIMAX_GROUP_ID";
const BASE_URL_ENV: &str = "MINIMAX_API_BASE";

/// Price per thousand tokens
const PRICE_PER_1K_TOKENS: f64 = 0.015;
/// Price per web-search plugin invocation
const PRICE_PER_WEB_SEARCH: f64 = 0.03;

const ALLOWED_ROLES: [&str; 3] = ["user", "assistant", "function"];

/// MiniMax Pro adapter
///
/// A configured system prompt replaces the bot persona description. The
/// persona list and reply constraints can be overridden per request through
/// the `bot_setting` and `reply_constraints` parameters.
#[derive(Debug, Clone)]
pub struct MinimaxProAdapter {
    model: String,
    base_url: Url,
    api_key: SecretString,
    group_id: String,
    bot_name: String,
    bot_content: String,
}

impl MinimaxProAdapter {
    pub fn from_config(config: &EndpointConfig) -> Result<Self, LlmError> {
        let group_id = config
            .group_id
            .clone()
            .or_else(|| super::env_value(GROUP_ID_ENV))
            .ok_or_else(|| LlmError::MissingCredential {
                provider: ProviderType::MinimaxPro.to_string(),
                env_var: GROUP_ID_ENV,
            })?;

        let bot_name = config.bot_name.clone().unwrap_or_else(|| DEFAULT_BOT_NAME.to_owned());
        if bot_name.trim().is_empty() {
            return Err(LlmError::Configuration("minimax_pro bot_name must not be empty".to_owned()));
        }

        Ok(Self {
            model: config.model.clone(),
            base_url: resolve_base_url(config.base_url.as_ref(), BASE_URL_ENV, Some(DEFAULT_BASE_URL))?,
            api_key: require_secret(config.api_key.as_ref(), API_KEY_ENV, ProviderType::MinimaxPro)?,
            group_id,
            bot_name,
            bot_content: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_BOT_CONTENT.to_owned()),
        })
    }

    fn request(&self, messages: &[Message], parameters: &ChatParameters, stream: bool) -> Result<HttpRequestSpec, LlmError> {
        let parameters = parameters.clone().with_nonzero_sampling(ZERO_SAMPLING_FLOOR);
        let mut extra = parameters.extra;

        let bot_setting: Vec<BotSetting> = match extra.remove("bot_setting") {
            Some(value) => serde_json::from_value(value).map_err(|e| LlmError::InvalidParameters(format!("bot_setting: {e}")))?,
            None => vec![BotSetting {
                bot_name: self.bot_name.clone(),
                content: self.bot_content.clone(),
            }],
        };
        let default_bot = match bot_setting.as_slice() {
            [] => return Err(LlmError::InvalidParameters("bot_setting must not be empty".to_owned())),
            [only] => Some(only.bot_name.as_str()),
            _ => None,
        };

        let reply_constraints: ReplyConstraints = match extra.remove("reply_constraints") {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| LlmError::InvalidParameters(format!("reply_constraints: {e}")))?
            }
            None => ReplyConstraints {
                sender_type: SenderType::Bot,
                sender_name: default_bot
                    .ok_or_else(|| {
                        LlmError::InvalidParameters("reply_constraints is required with several bots".to_owned())
                    })?
                    .to_owned(),
            },
        };
        if !bot_setting.iter().any(|bot| bot.bot_name == reply_constraints.sender_name) {
            return Err(LlmError::InvalidParameters(format!(
                "reply_constraints sender_name '{}' is not a bot_setting name",
                reply_constraints.sender_name
            )));
        }

        let wire_messages = messages
            .iter()
            .map(|message| to_wire_message(message, default_bot))
            .collect::<Result<Vec<_>, _>>()?;

        let wire = MinimaxProRequest {
            model: self.model.clone(),
            messages: wire_messages,
            bot_setting,
            reply_constraints,
            temperature: parameters.temperature,
            top_p: parameters.top_p,
            tokens_to_generate: parameters.max_tokens,
            functions: parameters.functions.map(|functions| {
                functions
                    .into_iter()
                    .map(|f| OpenAiFunction {
                        name: f.name,
                        description: f.description,
                        parameters: f.parameters,
                    })
                    .collect()
            }),
            stream: stream.then_some(true),
            extra,
        };

        let mut spec = HttpRequestSpec::new(self.base_url.clone(), to_body(&wire)?);
        spec.headers.insert(AUTHORIZATION, bearer(&self.api_key)?);
        spec.query.push(("GroupId".to_owned(), self.group_id.clone()));
        Ok(spec)
    }

    fn parse(&self, body: &Value) -> Result<MinimaxProResponse, LlmError> {
        let response: MinimaxProResponse = from_body(body)?;
        if let Some(status) = &response.base_resp
            && status.status_code != 0
        {
            return Err(LlmError::unexpected(
                body.to_string(),
                format!("minimax status {}: {}", status.status_code, status.status_msg),
            ));
        }
        if response.choices.is_empty() {
            return Err(LlmError::unexpected(body.to_string(), "response has no choices"));
        }
        tracing::trace!(model_id = %self.model_id(), "parsed minimax payload");
        Ok(response)
    }
}

impl ChatAdapter for MinimaxProAdapter {
    fn model_id(&self) -> String {
        format!("{}/{}", ProviderType::MinimaxPro, self.model)
    }

    fn transport(&self) -> StreamTransport {
        StreamTransport::Lines
    }

    fn build_request(&self, messages: &[Message], parameters: &ChatParameters) -> Result<HttpRequestSpec, LlmError> {
        self.request(messages, parameters, false)
    }

    fn parse_response(&self, body: &Value) -> Result<ChatOutput, LlmError> {
        let response = self.parse(body)?;
        let usage = response.usage.unwrap_or_default();
        let Some(choice) = response.choices.into_iter().next() else {
            return Err(LlmError::unexpected(body.to_string(), "response has no choices"));
        };

        let web_searches = choice
            .messages
            .iter()
            .filter(|m| m.sender_name == WEB_SEARCH_SENDER)
            .count();
        let messages = choice.messages.into_iter().map(from_wire_message).collect();

        let mut output = ChatOutput::new(self.model_id(), messages).with_raw_response(body.clone());
        output.finish_reason = choice.finish_reason;
        output.usage = Some(Usage {
            total_tokens: usage.total_tokens,
            ..Usage::default()
        });
        output.cost = Some(cost(usage.total_tokens, web_searches));
        insert_sensitivity(&mut output.extra, response.input_sensitive, response.output_sensitive);
        Ok(output)
    }

    fn build_stream_request(
        &self,
        messages: &[Message],
        parameters: &ChatParameters,
    ) -> Result<HttpRequestSpec, LlmError> {
        self.request(messages, parameters, true)
    }

    fn parse_stream_chunk(&self, chunk: &Value) -> Result<StreamEvent, LlmError> {
        let response = self.parse(chunk)?;
        let Some(choice) = response.choices.into_iter().next() else {
            return Err(LlmError::unexpected(chunk.to_string(), "chunk has no choices"));
        };
        let Some(delta) = choice.messages.into_iter().next().map(|m| m.text) else {
            return Err(LlmError::unexpected(chunk.to_string(), "chunk has no messages"));
        };

        if response.reply.is_empty() {
            return Ok(StreamEvent::text(delta));
        }

        let usage = response.usage.unwrap_or_default();
        Ok(StreamEvent::Finish {
            delta,
            finish_reason: choice.finish_reason,
            usage: Some(Usage {
                total_tokens: usage.total_tokens,
                ..Usage::default()
            }),
            cost: Some(cost(usage.total_tokens, 0)),
        })
    }
}

fn to_wire_message(message: &Message, default_bot: Option<&str>) -> Result<MinimaxProMessage, MessageError> {
    let bot_name = |name: Option<&str>| {
        name.or(default_bot)
            .map(str::to_owned)
            .ok_or_else(|| MessageError::value("bot name is required"))
    };

    match message {
        Message::User { content, name } => Ok(MinimaxProMessage {
            sender_type: SenderType::User,
            sender_name: name.clone().unwrap_or_else(|| DEFAULT_USER_NAME.to_owned()),
            text: content.clone(),
            function_call: None,
        }),
        Message::Assistant {
            content: AssistantContent::Text(text),
            name,
        } => Ok(MinimaxProMessage {
            sender_type: SenderType::Bot,
            sender_name: bot_name(name.as_deref())?,
            text: text.clone(),
            function_call: None,
        }),
        Message::Assistant {
            content: AssistantContent::FunctionCall(call),
            name,
        } => Ok(MinimaxProMessage {
            sender_type: SenderType::Bot,
            sender_name: bot_name(name.as_deref())?,
            text: String::new(),
            function_call: Some(MinimaxFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            }),
        }),
        Message::Function { name, content } => Ok(MinimaxProMessage {
            sender_type: SenderType::Function,
            sender_name: name.clone(),
            text: content.clone(),
            function_call: None,
        }),
        Message::Assistant {
            content: AssistantContent::ToolCalls(_),
            ..
        } => Err(MessageError::unsupported_role("assistant tool_calls", &ALLOWED_ROLES)),
        Message::System { .. } | Message::Tool { .. } => {
            Err(MessageError::unsupported_role(message.role().as_str(), &ALLOWED_ROLES))
        }
    }
}

fn from_wire_message(message: MinimaxProMessage) -> Message {
    if let Some(call) = message.function_call {
        return Message::function_call(FunctionCall::new(call.name, call.arguments)).with_name(message.sender_name);
    }
    match message.sender_type {
        SenderType::User => Message::user(message.text).with_name(message.sender_name),
        SenderType::Bot => Message::assistant(message.text).with_name(message.sender_name),
        SenderType::Function => Message::function(message.sender_name, message.text),
    }
}

#[allow(clippy::cast_precision_loss)]
fn cost(total_tokens: u64, web_searches: usize) -> f64 {
    PRICE_PER_1K_TOKENS * (total_tokens as f64 / 1000.0) + PRICE_PER_WEB_SEARCH * web_searches as f64
}

fn insert_sensitivity(extra: &mut serde_json::Map<String, Value>, input: Option<bool>, output: Option<bool>) {
    if let Some(input) = input {
        extra.insert("input_sensitive".to_owned(), Value::Bool(input));
    }
    if let Some(output) = output {
        extra.insert("output_sensitive".to_owned(), Value::Bool(output));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn adapter() -> MinimaxProAdapter {
        let mut config = EndpointConfig::new(ProviderType::MinimaxPro, "abab5.5-chat");
        config.api_key = Some(SecretString::from("mm-key".to_owned()));
        config.group_id = Some("group-1".to_owned());
        MinimaxProAdapter::from_config(&config).unwrap()
    }

    #[test]
    fn request_uses_minimax_field_names() {
        let parameters = ChatParameters::default()
            .with_temperature(0.0)
            .with_top_p(0.0)
            .with_max_tokens(256);
        let spec = adapter()
            .build_request(&[Message::user("hi"), Message::assistant("hello")], &parameters)
            .unwrap();

        assert_eq!(spec.query, vec![("GroupId".to_owned(), "group-1".to_owned())]);
        assert_eq!(spec.body["temperature"], ZERO_SAMPLING_FLOOR);
        assert_eq!(spec.body["top_p"], ZERO_SAMPLING_FLOOR);
        assert_eq!(spec.body["tokens_to_generate"], 256);
        assert!(spec.body.get("max_tokens").is_none());
        assert_eq!(
            spec.body["messages"][0],
            json!({ "sender_type": "USER", "sender_name": DEFAULT_USER_NAME, "text": "hi" })
        );
        assert_eq!(spec.body["messages"][1]["sender_name"], DEFAULT_BOT_NAME);
        assert_eq!(spec.body["reply_constraints"]["sender_name"], DEFAULT_BOT_NAME);
    }

    #[test]
    fn system_messages_are_a_type_error() {
        let err = adapter()
            .build_request(&[Message::system("rules")], &ChatParameters::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::Message(MessageError::Type { .. })));
    }

    #[test]
    fn nameless_bot_message_with_several_bots_is_a_value_error() {
        let parameters = ChatParameters::default()
            .with_extra(
                "bot_setting",
                json!([{ "bot_name": "a", "content": "x" }, { "bot_name": "b", "content": "y" }]),
            )
            .with_extra("reply_constraints", json!({ "sender_type": "BOT", "sender_name": "a" }));
        let err = adapter()
            .build_request(&[Message::user("hi"), Message::assistant("yo")], &parameters)
            .unwrap_err();
        assert!(matches!(err, LlmError::Message(MessageError::Value { .. })));
    }

    #[test]
    fn parses_response_with_cost() {
        let body = json!({
            "choices": [{
                "messages": [{ "sender_type": "BOT", "sender_name": DEFAULT_BOT_NAME, "text": "你好" }],
                "finish_reason": "stop"
            }],
            "reply": "你好",
            "usage": { "total_tokens": 2000 },
            "input_sensitive": false,
            "output_sensitive": false,
            "base_resp": { "status_code": 0, "status_msg": "" }
        });
        let output = adapter().parse_response(&body).unwrap();

        assert_eq!(output.reply(), "你好");
        assert_eq!(output.last_message().and_then(Message::name), Some(DEFAULT_BOT_NAME));
        assert!((output.cost.unwrap() - 0.03).abs() < 1e-9);
        assert_eq!(output.extra["input_sensitive"], false);
    }

    #[test]
    fn error_status_is_unexpected_response() {
        let body = json!({ "choices": [], "base_resp": { "status_code": 1004, "status_msg": "auth failed" } });
        let err = adapter().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("auth failed"));
    }

    #[test]
    fn stream_chunk_with_reply_finishes() {
        let partial = json!({ "choices": [{ "messages": [{ "sender_type": "BOT", "sender_name": "b", "text": "你" }] }], "reply": "" });
        assert_eq!(adapter().parse_stream_chunk(&partial).unwrap(), StreamEvent::text("你"));

        let last = json!({
            "choices": [{ "messages": [{ "sender_type": "BOT", "sender_name": "b", "text": "好" }], "finish_reason": "stop" }],
            "reply": "你好",
            "usage": { "total_tokens": 1000 }
        });
        match adapter().parse_stream_chunk(&last).unwrap() {
            StreamEvent::Finish {
                delta, finish_reason, cost, ..
            } => {
                assert_eq!(delta, "好");
                assert_eq!(finish_reason.as_deref(), Some("stop"));
                assert!((cost.unwrap() - 0.015).abs() < 1e-9);
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }
}
