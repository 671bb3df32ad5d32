use lmkit_llm::ChatOutput;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskResult {
    Success {
        output: ChatOutput,
        /// Value produced by the executor's postprocess hook, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parsed: Option<Value>,
    },
    Failure {
        error: String,
        /// Model output the postprocess hook rejected
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ChatOutput>,
    },
}

impl TaskResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Output of a successful task
    pub const fn output(&self) -> Option<&ChatOutput> {
        match self {
            Self::Success { output, .. } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    pub const fn parsed(&self) -> Option<&Value> {
        match self {
            Self::Success { parsed, .. } => parsed.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Model output, including one a failed postprocess step left behind
    pub const fn response(&self) -> Option<&ChatOutput> {
        match self {
            Self::Success { output, .. } => Some(output),
            Self::Failure { response, .. } => response.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

impl From<ChatOutput> for TaskResult {
    fn from(output: ChatOutput) -> Self {
        Self::Success { output, parsed: None }
    }
}
