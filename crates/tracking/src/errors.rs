//! Error and retry-policy types for the tracking domain.
//!
//! [`TrackingError`] is the single error type crossing the port boundary.
//! Adapters map their transport-specific failures (HTTP status codes, client
//! errors, undecodable bodies) into it; the orchestration layer never sees a
//! `reqwest` error directly.
//!
//! [`RetryPolicy`] is a cross-cutting concern: adapters consult
//! [`TrackingError::retry_policy`] to decide whether to re-issue a request.

use std::time::Duration;

use thiserror::Error;

use crate::{RepositorySlug, RunId};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable` errors: transport failures (connect, timeout), HTTP 429 and
///   5xx responses.
/// - `NonRetryable` errors: everything else, in particular invalid arguments,
///   authentication failures and missing resources.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Tracking errors
// ---------------------------------------------------------------------------

/// Errors produced by the tracking domain and its adapters.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A key, value or identifier failed local validation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected input.
        message: String,
    },

    /// Client or adapter configuration is invalid (e.g. malformed endpoint).
    ///
    /// Produced at construction time; nothing is sent to the network.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The request never produced an HTTP response (connect failure, timeout,
    /// TLS error).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The remote service answered with a non-success status.
    #[error("API error {status} ({error_code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service-specific error code (e.g. `"RESOURCE_DOES_NOT_EXIST"`).
        error_code: String,
        /// Human-readable message from the service.
        message: String,
        /// Delay requested by the service before retrying, if any.
        retry_after: Option<Duration>,
    },

    /// The credentials were missing or rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of the authentication failure.
        message: String,
    },

    /// The hosted repository does not exist or is not visible to the caller.
    #[error("Repository not found: {repository}")]
    RepositoryNotFound {
        /// The repository that was looked up.
        repository: RepositorySlug,
    },

    /// A response body could not be decoded.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description of the decoding failure.
        message: String,
    },

    /// A record was submitted after the run scope had closed.
    #[error("Run {run_id} is no longer active")]
    RunNotActive {
        /// The run the record was addressed to.
        run_id: RunId,
    },

    /// Work inside a run scope was abandoned by the caller.
    #[error("Aborted: {reason}")]
    Aborted {
        /// Why the work was abandoned.
        reason: String,
    },
}

impl TrackingError {
    /// Shorthand for [`TrackingError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`TrackingError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` when the service reported that the addressed resource
    /// does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api {
                status, error_code, ..
            } => *status == 404 || error_code == "RESOURCE_DOES_NOT_EXIST",
            Self::RepositoryNotFound { .. } => true,
            _ => false,
        }
    }

    /// Classifies this error for retry decisions.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { .. } => RetryPolicy::Retryable { after: None },
            Self::Api {
                status,
                retry_after,
                ..
            } if *status == 429 || (500..600).contains(status) => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}
