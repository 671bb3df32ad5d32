//! Request-start rate gating for batch execution

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod gate;

pub use error::RateLimitError;
pub use gate::{DEFAULT_WINDOW, RateGate};

/// Create a gate admitting `max_requests_per_minute` starts per rolling minute
pub fn create_rate_gate(max_requests_per_minute: u32) -> Result<RateGate, RateLimitError> {
    RateGate::new(max_requests_per_minute, DEFAULT_WINDOW)
}
