//! Port traits implemented by infrastructure crates.
//!
//! The orchestration layer (`session`) talks only to these traits, so the
//! tracking backend and the repository host can be swapped for in-memory
//! fakes in tests.

use async_trait::async_trait;

use crate::{
    BridgeOptions, CreateRun, ExperimentId, IntegrationBinding, Metric, Param, RepositorySlug,
    RunId, RunInfo, RunRecord, RunStatus, Timestamp, TrackingError, TrackingUri,
};

/// A remote store of experiments, runs, parameters and metrics.
///
/// Every method maps onto one request against the tracking service. Records
/// are append-only: creating a run always yields a new run, never a merge
/// into an existing one.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Endpoint this store talks to.
    fn tracking_uri(&self) -> &TrackingUri;

    /// Looks up an experiment by name.
    ///
    /// Returns an error for which [`TrackingError::is_not_found`] holds when
    /// no experiment has that name.
    async fn get_experiment_by_name(&self, name: &str) -> Result<ExperimentId, TrackingError>;

    /// Creates a new experiment and returns its identifier.
    async fn create_experiment(&self, name: &str) -> Result<ExperimentId, TrackingError>;

    /// Creates a new run in the `Running` state.
    async fn create_run(&self, request: CreateRun) -> Result<RunInfo, TrackingError>;

    /// Attaches a parameter to a run.
    async fn log_param(&self, run_id: &RunId, param: &Param) -> Result<(), TrackingError>;

    /// Appends a metric value to a run.
    async fn log_metric(&self, run_id: &RunId, metric: &Metric) -> Result<(), TrackingError>;

    /// Moves a run to `status`, recording `end_time` for terminal states.
    async fn update_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        end_time: Timestamp,
    ) -> Result<RunInfo, TrackingError>;

    /// Reads a run back with everything logged to it.
    async fn get_run(&self, run_id: &RunId) -> Result<RunRecord, TrackingError>;
}

/// A code-hosting service that can vouch for a repository and bridge
/// tracking traffic to its own tracking endpoint.
#[async_trait]
pub trait RepositoryIntegration: Send + Sync {
    /// Verifies `repository` exists and sets up the requested bridges.
    async fn bind(
        &self,
        repository: &RepositorySlug,
        bridge: BridgeOptions,
    ) -> Result<IntegrationBinding, TrackingError>;
}
