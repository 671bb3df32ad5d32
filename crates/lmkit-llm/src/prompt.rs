use serde_json::Value;

use crate::error::MessageError;
use crate::types::{Message, Role};

/// Anything a caller may hand in as a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// Bare text, sent as a single user message
    Text(String),
    Message(Message),
    Messages(Vec<Message>),
    /// Loosely typed records, e.g. lines of a JSONL file
    Records(Vec<Value>),
}

impl Prompt {
    /// Interpret an arbitrary JSON value
    ///
    /// Strings become [`Prompt::Text`], arrays a list of records, anything
    /// else a single record.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(records) => Self::Records(records),
            other => Self::Records(vec![other]),
        }
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Message> for Prompt {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Vec<Message>> for Prompt {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

impl From<Value> for Prompt {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

/// Normalize a prompt into a validated, non-empty conversation
///
/// # Errors
///
/// [`MessageError::Type`] for records that are not objects or name an
/// unknown role; [`MessageError::Value`] for records missing a role, records
/// whose fields do not fit their role, messages that break a role invariant,
/// and empty conversations.
pub fn ensure_messages(prompt: &Prompt) -> Result<Vec<Message>, MessageError> {
    let messages = match prompt {
        Prompt::Text(text) => vec![Message::user(text.clone())],
        Prompt::Message(message) => vec![message.clone()],
        Prompt::Messages(messages) => messages.clone(),
        Prompt::Records(records) => records.iter().map(message_from_record).collect::<Result<_, _>>()?,
    };

    if messages.is_empty() {
        return Err(MessageError::value("conversation is empty"));
    }
    for message in &messages {
        message.validate()?;
    }

    Ok(messages)
}

fn message_from_record(record: &Value) -> Result<Message, MessageError> {
    let Some(object) = record.as_object() else {
        return Err(MessageError::Type {
            found: json_kind(record).to_owned(),
            allowed: "message object".to_owned(),
        });
    };

    let Some(role) = object.get("role").and_then(Value::as_str) else {
        return Err(MessageError::value("message record has no role"));
    };
    role.parse::<Role>()?;

    serde_json::from_value(record.clone()).map_err(|e| MessageError::value(format!("malformed {role} message: {e}")))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_text_becomes_one_user_message() {
        let messages = ensure_messages(&"Hello".into()).unwrap();
        assert_eq!(messages, vec![Message::user("Hello")]);
    }

    #[test]
    fn records_are_parsed_in_order() {
        let prompt = Prompt::from_json(json!([
            { "role": "system", "content": "be brief" },
            { "role": "user", "content": "hi" },
        ]));
        let messages = ensure_messages(&prompt).unwrap();
        assert_eq!(messages, vec![Message::system("be brief"), Message::user("hi")]);
    }

    #[test]
    fn unknown_role_is_a_type_error() {
        let prompt = Prompt::from_json(json!({ "role": "narrator", "content": "x" }));
        assert!(matches!(ensure_messages(&prompt), Err(MessageError::Type { .. })));
    }

    #[test]
    fn non_object_record_is_a_type_error() {
        let prompt = Prompt::Records(vec![json!(42)]);
        let err = ensure_messages(&prompt).unwrap_err();
        assert!(matches!(err, MessageError::Type { ref found, .. } if found == "number"));
    }

    #[test]
    fn function_record_without_name_is_a_value_error() {
        let prompt = Prompt::from_json(json!({ "role": "function", "content": "42" }));
        assert!(matches!(ensure_messages(&prompt), Err(MessageError::Value { .. })));
    }

    #[test]
    fn missing_role_is_a_value_error() {
        let prompt = Prompt::from_json(json!({ "content": "hi" }));
        assert!(matches!(ensure_messages(&prompt), Err(MessageError::Value { .. })));
    }

    #[test]
    fn empty_conversation_is_rejected() {
        assert!(ensure_messages(&Prompt::Messages(Vec::new())).is_err());
    }
}
