use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MessageError;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response, text or a call request
    Assistant,
    /// Result of a function call
    Function,
    /// Result of a tool call
    Tool,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [&'static str; 5] = ["system", "user", "assistant", "function", "tool"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "function" => Ok(Self::Function),
            "tool" => Ok(Self::Tool),
            other => Err(MessageError::unsupported_role(other, &Self::ALL)),
        }
    }
}

/// A function invocation requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments, passed through verbatim
    pub arguments: String,
    /// Free-form reasoning some providers attach to a call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            thoughts: None,
        }
    }
}

/// One entry of an assistant tool-call list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call identifier
    pub id: String,
    /// Function being called
    pub function: FunctionCall,
}

/// Assistant content: exactly one of text, a function call, or tool calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantContent {
    Text(String),
    FunctionCall(FunctionCall),
    ToolCalls(Vec<ToolCall>),
}

/// A normalized conversation message
///
/// Function and tool results always carry the name of the function they
/// answer. Messages are plain values; a conversation is a `Vec<Message>`
/// that only ever grows at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant {
        content: AssistantContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Function {
        name: String,
        content: String,
    },
    Tool {
        name: String,
        tool_call_id: String,
        #[serde(default)]
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: AssistantContent::Text(content.into()),
            name: None,
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self::Assistant {
            content: AssistantContent::FunctionCall(call),
            name: None,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: AssistantContent::ToolCalls(calls),
            name: None,
        }
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn tool(name: impl Into<String>, tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            name: name.into(),
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Attach a participant name to a system, user or assistant message
    ///
    /// Function and tool messages keep their function name.
    #[must_use]
    pub fn with_name(mut self, participant: impl Into<String>) -> Self {
        match &mut self {
            Self::System { name, .. } | Self::User { name, .. } | Self::Assistant { name, .. } => {
                *name = Some(participant.into());
            }
            Self::Function { .. } | Self::Tool { .. } => {}
        }
        self
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Function { .. } => Role::Function,
            Self::Tool { .. } => Role::Tool,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::System { name, .. } | Self::User { name, .. } | Self::Assistant { name, .. } => name.as_deref(),
            Self::Function { name, .. } | Self::Tool { name, .. } => Some(name),
        }
    }

    /// Plain text content, `None` for assistant call requests
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Function { content, .. }
            | Self::Tool { content, .. }
            | Self::Assistant {
                content: AssistantContent::Text(content),
                ..
            } => Some(content),
            Self::Assistant { .. } => None,
        }
    }

    /// Stable textual form of the content, used for hashing
    pub fn canonical_content(&self) -> String {
        match self {
            Self::Assistant {
                content: AssistantContent::FunctionCall(call),
                ..
            } => format_call(call),
            Self::Assistant {
                content: AssistantContent::ToolCalls(calls),
                ..
            } => calls
                .iter()
                .map(|call| format!("{}:{}", call.id, format_call(&call.function)))
                .collect::<Vec<_>>()
                .join(";"),
            other => other.text().unwrap_or_default().to_owned(),
        }
    }

    /// Check the role/content invariants
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Value`] when a function or tool message has
    /// no name, or an assistant call request is empty
    pub fn validate(&self) -> Result<(), MessageError> {
        match self {
            Self::Function { name, .. } if name.trim().is_empty() => {
                Err(MessageError::value("function message requires a name"))
            }
            Self::Tool { name, .. } if name.trim().is_empty() => {
                Err(MessageError::value("tool message requires a name"))
            }
            Self::Tool { tool_call_id, .. } if tool_call_id.is_empty() => {
                Err(MessageError::value("tool message requires a tool_call_id"))
            }
            Self::Assistant {
                content: AssistantContent::FunctionCall(call),
                ..
            } if call.name.trim().is_empty() => Err(MessageError::value("function call requires a name")),
            Self::Assistant {
                content: AssistantContent::ToolCalls(calls),
                ..
            } => {
                if calls.is_empty() {
                    return Err(MessageError::value("tool call list is empty"));
                }
                if calls.iter().any(|c| c.function.name.trim().is_empty()) {
                    return Err(MessageError::value("tool call requires a function name"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn format_call(call: &FunctionCall) -> String {
    format!("{}({})", call.name, call.arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tag_round_trips_through_json() {
        let message = Message::function("get_weather", "{\"temp\": 21}");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "function");
        assert_eq!(json["name"], "get_weather");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn assistant_content_variants_deserialize() {
        let text: Message = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(text.text(), Some("hi"));

        let call: Message =
            serde_json::from_str(r#"{"role":"assistant","content":{"name":"f","arguments":"{}"}}"#).unwrap();
        assert_eq!(call.text(), None);
        assert_eq!(call.canonical_content(), "f({})");
    }

    #[test]
    fn unknown_role_is_a_type_error() {
        let err = "robot".parse::<Role>().unwrap_err();
        assert!(matches!(err, MessageError::Type { ref found, .. } if found == "robot"));
    }

    #[test]
    fn function_message_without_name_is_invalid() {
        let err = Message::function("  ", "result").validate().unwrap_err();
        assert!(matches!(err, MessageError::Value { .. }));
    }

    #[test]
    fn with_name_ignores_function_messages() {
        let message = Message::function("lookup", "ok").with_name("other");
        assert_eq!(message.name(), Some("lookup"));
        assert_eq!(Message::user("hi").with_name("alice").name(), Some("alice"));
    }
}
