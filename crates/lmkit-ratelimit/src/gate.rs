use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::RateLimitError;

/// Rolling window the request budget applies to
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Slack added to every computed wait so the oldest start has surely expired
const SAFETY_MARGIN: Duration = Duration::from_secs(1);

/// Sliding-window gate on request starts
///
/// At most `max_requests` acquisitions succeed within any `window`. A caller
/// that would exceed the budget sleeps while holding the gate, so later
/// callers queue behind it in arrival order.
#[derive(Debug)]
pub struct RateGate {
    max_requests: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateGate {
    /// Create a gate
    ///
    /// # Arguments
    /// * `max_requests` - Maximum starts per window
    /// * `window` - Rolling window duration
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        if max_requests == 0 {
            return Err(RateLimitError::Config("max_requests must be > 0".to_string()));
        }
        if window.is_zero() {
            return Err(RateLimitError::Config("rate limit window must be > 0".to_string()));
        }

        let max_requests = usize::try_from(max_requests)
            .map_err(|e| RateLimitError::Config(format!("max_requests out of range: {e}")))?;
        Ok(Self {
            max_requests,
            window,
            starts: Mutex::new(VecDeque::with_capacity(max_requests)),
        })
    }

    pub const fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a start is allowed, then record it
    ///
    /// Returns how long the caller was delayed by the budget.
    pub async fn acquire(&self) -> Duration {
        let mut starts = self.starts.lock().await;
        let mut waited = Duration::ZERO;

        loop {
            let now = Instant::now();
            evict_expired(&mut starts, now, self.window);
            if starts.len() < self.max_requests {
                break;
            }
            let Some(&oldest) = starts.front() else {
                break;
            };

            // Whole elapsed seconds only, so the wait never undershoots
            let elapsed = Duration::from_secs(now.duration_since(oldest).as_secs());
            let wait = self.window.saturating_sub(elapsed) + SAFETY_MARGIN;
            tracing::info!(
                wait_secs = wait.as_secs(),
                max_requests = self.max_requests,
                "request budget exhausted, waiting"
            );
            tokio::time::sleep(wait).await;
            waited += wait;
        }

        starts.push_back(Instant::now());
        waited
    }

    /// Starts recorded within the current window
    pub async fn in_flight_window(&self) -> usize {
        let mut starts = self.starts.lock().await;
        evict_expired(&mut starts, Instant::now(), self.window);
        starts.len()
    }
}

fn evict_expired(starts: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while starts
        .front()
        .is_some_and(|&start| now.duration_since(start) >= window)
    {
        starts.pop_front();
    }
}
