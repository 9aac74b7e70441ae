//! Shared value types for the tracking domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (keys use a restricted alphabet, metric values are
//! finite, parameter values are bounded) that are checked before anything is
//! sent to a tracking server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExperimentId, RepoName, RepoOwner, RunId, RunName, TrackingError, TrackingUri};

/// Longest key accepted for parameters, metrics and tags.
pub const MAX_KEY_LENGTH: usize = 250;

/// Longest value accepted for a parameter.
pub const MAX_PARAM_VALUE_LENGTH: usize = 6000;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

fn validate_key(kind: &str, key: &str) -> Result<(), TrackingError> {
    if key.is_empty() {
        return Err(TrackingError::invalid_argument(format!(
            "{kind} key must not be empty"
        )));
    }
    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(TrackingError::invalid_argument(format!(
            "{kind} key '{key}' exceeds {MAX_KEY_LENGTH} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ' ');
    if let Some(bad) = key.chars().find(|c| !allowed(*c)) {
        return Err(TrackingError::invalid_argument(format!(
            "{kind} key '{key}' contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

macro_rules! record_key {
    (
        $(#[$attr:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps a key.
            ///
            /// Keys are non-empty, at most [`MAX_KEY_LENGTH`] characters, and
            /// limited to ASCII alphanumerics, `_`, `-`, `.`, `/` and space.
            pub fn parse(value: impl Into<String>) -> Result<Self, TrackingError> {
                let v = value.into();
                validate_key($kind, &v)?;
                Ok(Self(v))
            }

            /// Returns the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_key! {
    /// Key of a [`Param`].
    ParamKey, "parameter"
}

record_key! {
    /// Key of a [`Metric`].
    MetricKey, "metric"
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An immutable string-valued configuration fact attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub key: ParamKey,
    pub value: String,
}

impl Param {
    /// Validates the key and value of a parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, TrackingError> {
        let key = ParamKey::parse(key)?;
        let value = value.into();
        if value.chars().count() > MAX_PARAM_VALUE_LENGTH {
            return Err(TrackingError::invalid_argument(format!(
                "value of parameter '{key}' exceeds {MAX_PARAM_VALUE_LENGTH} characters"
            )));
        }
        Ok(Self { key, value })
    }
}

/// One numeric measurement attached to a run.
///
/// A metric key may carry a series of values; `step` orders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: MetricKey,
    pub value: f64,
    pub timestamp: Timestamp,
    pub step: i64,
}

impl Metric {
    /// Builds a metric, rejecting non-finite values (JSON cannot carry them).
    pub fn new(
        key: impl Into<String>,
        value: f64,
        timestamp: Timestamp,
        step: i64,
    ) -> Result<Self, TrackingError> {
        let key = MetricKey::parse(key)?;
        if !value.is_finite() {
            return Err(TrackingError::invalid_argument(format!(
                "value of metric '{key}' must be finite, got {value}"
            )));
        }
        Ok(Self {
            key,
            value,
            timestamp,
            step,
        })
    }
}

/// A free-form string label attached to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

impl RunTag {
    /// Tags are not validated; the server enforces its own limits.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Lifecycle state of a run on the tracking server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The run is open and accepting records.
    Running,
    /// The run is queued but has not started.
    Scheduled,
    /// The run ended successfully.
    Finished,
    /// The run ended because its work failed.
    Failed,
    /// The run was abandoned before completion.
    Killed,
}

impl RunStatus {
    /// Returns `true` for states a run never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }

    /// Upper-case wire name (`"RUNNING"`, `"FINISHED"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Scheduled => "SCHEDULED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: RunId,
    pub experiment_id: ExperimentId,
    pub run_name: Option<RunName>,
    pub status: RunStatus,
    pub start_time: Timestamp,
    /// `None` while the run is still open.
    pub end_time: Option<Timestamp>,
}

/// Parameters for creating a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRun {
    pub experiment_id: ExperimentId,
    pub run_name: Option<RunName>,
    pub start_time: Timestamp,
    pub tags: Vec<RunTag>,
}

/// A run read back from the tracking server, with everything logged to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub info: RunInfo,
    pub params: Vec<Param>,
    pub metrics: Vec<Metric>,
    pub tags: Vec<RunTag>,
}

// ---------------------------------------------------------------------------
// Repository integration
// ---------------------------------------------------------------------------

/// Identifies a hosted repository as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositorySlug {
    pub owner: RepoOwner,
    pub name: RepoName,
}

impl RepositorySlug {
    /// Builds a slug from already-validated parts.
    pub fn new(owner: RepoOwner, name: RepoName) -> Self {
        Self { owner, name }
    }

    /// Parses `"owner/name"`.
    pub fn parse(value: &str) -> Result<Self, TrackingError> {
        let (owner, name) = value.split_once('/').ok_or_else(|| {
            TrackingError::invalid_argument(format!("repository '{value}' is not owner/name"))
        })?;
        match (RepoOwner::new(owner), RepoName::new(name)) {
            (Some(owner), Some(name)) if !name.as_str().contains('/') => Ok(Self { owner, name }),
            _ => Err(TrackingError::invalid_argument(format!(
                "repository '{value}' is not owner/name"
            ))),
        }
    }
}

impl std::fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Credentials presented to a tracking server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// `Authorization: Bearer <token>`.
    Bearer { token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { .. } => f.write_str("Credentials::Basic(<redacted>)"),
            Self::Bearer { .. } => f.write_str("Credentials::Bearer(<redacted>)"),
        }
    }
}

/// Which bridges a repository integration should set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeOptions {
    /// Route experiment tracking through the repository host.
    pub mlflow: bool,
}

/// Outcome of binding a repository integration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationBinding {
    pub repository: RepositorySlug,
    /// Tracking endpoint the host serves for this repository, when bridged.
    pub tracking_uri: Option<TrackingUri>,
    /// Credentials to present to that endpoint, when bridged.
    pub credentials: Option<Credentials>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Tracking servers exchange milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a [`Timestamp`] from milliseconds since the Unix epoch.
    ///
    /// Returns `None` when the value is out of range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
