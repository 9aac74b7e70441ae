//! Experiment-tracking domain.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used across the workspace. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; `mlflow` and `dagshub` define *how* to
//! supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunId`, `TrackingUri`, etc.) |
//! | [`types`] | Value types (`Param`, `Metric`, `RunInfo`, `Credentials`, etc.) |
//! | [`errors`] | [`TrackingError`] and [`RetryPolicy`] |
//! | [`ports`] | [`TrackingStore`] and [`RepositoryIntegration`] traits |

pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RetryPolicy, TrackingError};
pub use identifiers::{
    ExperimentId, InvocationId, RepoName, RepoOwner, RunId, RunName, TrackingUri,
};
pub use ports::{RepositoryIntegration, TrackingStore};
pub use types::{
    BridgeOptions, CreateRun, Credentials, IntegrationBinding, Metric, MetricKey, Param,
    ParamKey, RepositorySlug, RunInfo, RunRecord, RunStatus, RunTag, Timestamp, MAX_KEY_LENGTH,
    MAX_PARAM_VALUE_LENGTH,
};
