//! MiniMax Pro chat completion wire format types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::openai::OpenAiFunction;

/// Default bot persona name
pub const DEFAULT_BOT_NAME: &str = "MM智能助理";

/// Default bot persona description
pub const DEFAULT_BOT_CONTENT: &str = "MM智能助理是一款由MiniMax自研的，没有调用其他产品的接口的大型语言模型。MiniMax是一家中国科技公司，一直致力于进行大模型相关的研究。";

/// Default name for user turns
pub const DEFAULT_USER_NAME: &str = "用户";

/// Sender name MiniMax uses for web-search plugin turns
pub const WEB_SEARCH_SENDER: &str = "plugin_web_search";

// -- Request types --

/// MiniMax Pro chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimaxProRequest {
    pub model: String,
    pub messages: Vec<MinimaxProMessage>,
    pub bot_setting: Vec<BotSetting>,
    pub reply_constraints: ReplyConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Generation limit, `max_tokens` in normalized parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_to_generate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<OpenAiFunction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Provider-specific parameters (`mask_sensitive_info`, `plugins`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Bot persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSetting {
    pub bot_name: String,
    pub content: String,
}

/// Which sender the reply must come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConstraints {
    pub sender_type: SenderType,
    pub sender_name: String,
}

/// MiniMax sender categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SenderType {
    User,
    Bot,
    Function,
}

/// Message in MiniMax Pro format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimaxProMessage {
    pub sender_type: SenderType,
    pub sender_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<MinimaxFunctionCall>,
}

/// Function call in MiniMax Pro format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimaxFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

// -- Response types --

/// MiniMax Pro response, shared by full responses and stream chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimaxProResponse {
    pub choices: Vec<MinimaxProChoice>,
    /// Final reply text; non-empty only on the last stream chunk
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub usage: Option<MinimaxUsage>,
    #[serde(default)]
    pub input_sensitive: Option<bool>,
    #[serde(default)]
    pub output_sensitive: Option<bool>,
    #[serde(default)]
    pub base_resp: Option<BaseResponse>,
}

/// Choice within a MiniMax Pro response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimaxProChoice {
    pub messages: Vec<MinimaxProMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage; MiniMax only reports the total
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MinimaxUsage {
    #[serde(default)]
    pub total_tokens: u64,
}

/// Status block MiniMax attaches to every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse {
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status_msg: String,
}
