//! Provider-agnostic conversation, parameter and output types
//!
//! Every adapter converts to and from these; nothing outside an adapter
//! sees a vendor wire format.

pub mod message;
pub mod output;
pub mod parameters;
pub mod stream;
pub mod tool;

pub use message::{AssistantContent, FunctionCall, Message, Role, ToolCall};
pub use output::{ChatOutput, HTTP_RESPONSE_KEY, Usage};
pub use parameters::{ChatParameters, ZERO_SAMPLING_FLOOR};
pub use stream::{StreamEvent, StreamOutput};
pub use tool::FunctionDefinition;
