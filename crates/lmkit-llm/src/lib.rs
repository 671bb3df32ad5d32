//! Unified chat-completion client for lmkit
//!
//! Normalizes the request and response shapes of several hosted chat APIs
//! (`OpenAI`, Azure `OpenAI`, MiniMax Pro) into one message/parameter model,
//! streams partial output as a uniform event sequence and retries transient
//! failures with bounded backoff.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod model;
pub mod prompt;
pub mod protocol;
pub mod provider;
pub mod retry;
pub mod streaming;
pub mod transport;
pub mod types;

pub use error::{LlmError, MessageError};
pub use model::{ChatModel, HttpChatModel};
pub use prompt::{Prompt, ensure_messages};
pub use provider::{Adapter, ChatAdapter};
pub use retry::RetryPolicy;
pub use streaming::DeltaStream;
pub use transport::{HttpRequestSpec, StreamTransport};
pub use types::{ChatOutput, ChatParameters, Message, Role, StreamEvent, StreamOutput, Usage};
