use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::output::Usage;

/// One step of a normalized streaming response
///
/// A stream is `Start`, any number of `Continue`, then one `Finish` or
/// `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Opens the stream; carries no text
    Start,
    /// Incremental text
    Continue { delta: String },
    /// Final fragment with completion metadata
    Finish {
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
    },
    /// Explicit terminator without metadata
    Done,
}

impl StreamEvent {
    pub fn delta(&self) -> &str {
        match self {
            Self::Continue { delta } | Self::Finish { delta, .. } => delta,
            Self::Start | Self::Done => "",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. } | Self::Done)
    }

    pub fn text(delta: impl Into<String>) -> Self {
        Self::Continue { delta: delta.into() }
    }

    /// `Finish` with only a final delta and reason
    pub fn finish(delta: impl Into<String>, finish_reason: Option<String>) -> Self {
        Self::Finish {
            delta: delta.into(),
            finish_reason,
            usage: None,
            cost: None,
        }
    }
}

/// A stream event together with the reply accumulated so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOutput {
    /// Identity of the streaming model
    pub model_id: String,
    /// Event as normalized by the delta engine
    pub event: StreamEvent,
    /// Concatenation of every delta up to and including this event
    pub reply: String,
    /// Provider chunk this event was parsed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl StreamOutput {
    pub fn is_finished(&self) -> bool {
        self.event.is_terminal()
    }
}
