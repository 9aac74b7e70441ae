//! Explicit tracking session.
//!
//! A [`TrackingSession`] binds one [`TrackingStore`] to one experiment for the
//! lifetime of a process invocation. It is constructed once and passed to
//! whatever needs to open runs; there is no process-wide "current endpoint".

use std::future::Future;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use tracking::{
    CreateRun, ExperimentId, InvocationId, RunInfo, RunName, RunStatus, RunTag, Timestamp,
    TrackingError, TrackingStore, TrackingUri,
};

use crate::run::{ActiveRun, RunHandle};

/// Tag recording how the run was launched.
pub const SOURCE_TYPE_TAG: &str = "mlflow.source.type";
/// Tag recording the program that created the run.
pub const SOURCE_NAME_TAG: &str = "mlflow.source.name";
/// Tag correlating the run with the invocation that created it.
pub const INVOCATION_TAG: &str = "invocation_id";

/// A tracking store bound to one experiment.
///
/// Every run opened through the session carries the same invocation id.
pub struct TrackingSession {
    store: Arc<dyn TrackingStore>,
    experiment_id: ExperimentId,
    invocation_id: InvocationId,
    source_name: String,
}

impl TrackingSession {
    /// Opens a session on `store`.
    ///
    /// With no experiment name, runs go to the server's default experiment.
    /// A named experiment is looked up and created when it does not exist.
    #[instrument(skip(store), fields(tracking_uri = %store.tracking_uri()))]
    pub async fn connect(
        store: Arc<dyn TrackingStore>,
        experiment_name: Option<&str>,
    ) -> Result<Self, TrackingError> {
        let experiment_id = match experiment_name {
            None => ExperimentId::default_experiment(),
            Some(name) => match store.get_experiment_by_name(name).await {
                Ok(id) => id,
                Err(err) if err.is_not_found() => {
                    info!(experiment = name, "experiment not found; creating it");
                    store.create_experiment(name).await?
                }
                Err(err) => return Err(err),
            },
        };

        Ok(Self {
            store,
            experiment_id,
            invocation_id: InvocationId::new_random(),
            source_name: default_source_name(),
        })
    }

    /// Overrides the invocation identifier attached to runs.
    pub fn with_invocation_id(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = invocation_id;
        self
    }

    /// Overrides the program name recorded on runs.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn tracking_uri(&self) -> &TrackingUri {
        self.store.tracking_uri()
    }

    pub fn experiment_id(&self) -> &ExperimentId {
        &self.experiment_id
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Creates a new run and returns its owning scope.
    ///
    /// Prefer [`TrackingSession::with_run`], which guarantees the run is
    /// ended on every exit path.
    #[instrument(skip(self), fields(experiment_id = %self.experiment_id, invocation_id = %self.invocation_id))]
    pub async fn start_run(&self, run_name: Option<RunName>) -> Result<ActiveRun, TrackingError> {
        let request = CreateRun {
            experiment_id: self.experiment_id.clone(),
            run_name,
            start_time: Timestamp::now(),
            tags: vec![
                RunTag::new(SOURCE_TYPE_TAG, "LOCAL"),
                RunTag::new(SOURCE_NAME_TAG, self.source_name.clone()),
                RunTag::new(INVOCATION_TAG, self.invocation_id.to_string()),
            ],
        };
        let info = self.store.create_run(request).await?;
        info!(run_id = %info.run_id, tracking_uri = %self.tracking_uri(), "run started");
        Ok(ActiveRun::new(Arc::clone(&self.store), info))
    }

    /// Runs `body` inside a fresh run scope.
    ///
    /// The run ends `Finished` when `body` succeeds and `Failed` when it
    /// returns an error; the body's error is returned even if ending the run
    /// also fails. If the returned future is dropped or `body` panics, the
    /// scope's `Drop` marks the run `Killed`.
    pub async fn with_run<F, Fut, T>(
        &self,
        run_name: Option<RunName>,
        body: F,
    ) -> Result<(T, RunInfo), TrackingError>
    where
        F: FnOnce(RunHandle) -> Fut,
        Fut: Future<Output = Result<T, TrackingError>>,
    {
        let run = self.start_run(run_name).await?;
        match body(run.handle()).await {
            Ok(value) => {
                let info = run.end(RunStatus::Finished).await?;
                Ok((value, info))
            }
            Err(err) => {
                let run_id = run.run_id().clone();
                if let Err(end_err) = run.end(RunStatus::Failed).await {
                    warn!(run_id = %run_id, error = %end_err, "failed to mark run as failed");
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("tracking_uri", self.tracking_uri())
            .field("experiment_id", &self.experiment_id)
            .field("invocation_id", &self.invocation_id)
            .finish()
    }
}

fn default_source_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string())
}
