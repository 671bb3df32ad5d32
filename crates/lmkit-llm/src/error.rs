use http::StatusCode;
use thiserror::Error;

/// Malformed input to the message normalization layer
///
/// Never retried: the same input fails the same way every time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// A message of a role the receiver cannot handle
    #[error("invalid message type '{found}', allowed: {allowed}")]
    Type {
        /// Role (or shape) that was received
        found: String,
        /// Roles accepted at this point
        allowed: String,
    },

    /// A message with the right role but inconsistent content
    #[error("invalid message value: {reason}")]
    Value { reason: String },
}

impl MessageError {
    pub fn value(reason: impl Into<String>) -> Self {
        Self::Value { reason: reason.into() }
    }

    pub fn unsupported_role(found: impl Into<String>, allowed: &[&str]) -> Self {
        Self::Type {
            found: found.into(),
            allowed: allowed.join(", "),
        }
    }
}

/// Errors raised while talking to a chat provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Conversation could not be normalized
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Generation parameters failed validation
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Provider returned something the adapter cannot interpret
    #[error("unexpected response: {reason}; payload: {body}")]
    UnexpectedResponse { body: String, reason: String },

    /// Provider answered with a non-success HTTP status
    #[error("provider returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Transport-level failure (connect, timeout, broken body)
    #[error("http error: {0}")]
    Http(String),

    /// Provider does not implement the requested feature
    #[error("{provider} does not support {feature}")]
    Unsupported { provider: String, feature: &'static str },

    /// No credential configured and none found in the environment
    #[error("missing credential for {provider}: set it in config or via {env_var}")]
    MissingCredential { provider: String, env_var: &'static str },

    /// Endpoint configuration cannot be turned into a model
    #[error("invalid endpoint configuration: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Build an [`LlmError::UnexpectedResponse`] around a raw payload
    pub fn unexpected(body: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            body: body.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
