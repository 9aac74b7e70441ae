//! Timeout and retry knobs for [`crate::MlflowClient`].

use std::time::Duration;

use tracking::TrackingError;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MlflowClientOptions {
    /// Upper bound on one HTTP exchange, connect to last body byte.
    pub request_timeout: Duration,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for MlflowClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
        }
    }
}

impl MlflowClientOptions {
    pub(crate) fn validate(&self) -> Result<(), TrackingError> {
        if self.request_timeout.is_zero() {
            return Err(TrackingError::configuration(
                "request_timeout must be greater than 0",
            ));
        }
        if self.max_attempts == 0 {
            return Err(TrackingError::configuration(
                "max_attempts must be greater than 0",
            ));
        }
        if self.initial_backoff.is_zero() {
            return Err(TrackingError::configuration(
                "initial_backoff must be greater than 0",
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(TrackingError::configuration(
                "max_backoff must not be smaller than initial_backoff",
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based): doubles each time,
    /// capped at `max_backoff`.
    pub(crate) fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}
