//! Batch execution of chat prompts
//!
//! Runs a list of prompts against one [`lmkit_llm::ChatModel`] with result
//! caching, a requests-per-minute gate, bounded concurrency and a per-task
//! error policy. Output order always matches input order.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod executor;
mod progress;
mod result;

pub use error::ExecutorError;
pub use executor::{Executor, Postprocess};
pub use progress::PROGRESS_THRESHOLD;
pub use result::TaskResult;
