//! Scoped runs.
//!
//! An [`ActiveRun`] owns the open run: it is the only thing that can finalize
//! it, and dropping it unfinalized (panic, cancelled future) still closes the
//! run on the server as `Killed`. [`RunHandle`]s are cheap clones handed to
//! the code doing the logging; once the run ends every handle refuses new
//! records with [`TrackingError::RunNotActive`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use tracking::{
    Metric, Param, RunId, RunInfo, RunStatus, Timestamp, TrackingError, TrackingStore,
};

/// Logging handle for one open run.
#[derive(Clone)]
pub struct RunHandle {
    store: Arc<dyn TrackingStore>,
    run_id: RunId,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id)
            .field("open", &self.is_open())
            .finish()
    }
}

impl RunHandle {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns `false` once the owning [`ActiveRun`] has ended or been dropped.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), TrackingError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TrackingError::RunNotActive {
                run_id: self.run_id.clone(),
            })
        }
    }

    /// Records a parameter on the run and returns what was sent.
    pub async fn log_param(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Param, TrackingError> {
        self.ensure_open()?;
        let param = Param::new(key, value)?;
        self.store.log_param(&self.run_id, &param).await?;
        debug!(run_id = %self.run_id, key = %param.key, "parameter logged");
        Ok(param)
    }

    /// Records a metric value at step 0, timestamped now.
    pub async fn log_metric(
        &self,
        key: impl Into<String>,
        value: f64,
    ) -> Result<Metric, TrackingError> {
        self.log_metric_at_step(key, value, 0).await
    }

    /// Records a metric value at an explicit step, timestamped now.
    pub async fn log_metric_at_step(
        &self,
        key: impl Into<String>,
        value: f64,
        step: i64,
    ) -> Result<Metric, TrackingError> {
        self.ensure_open()?;
        let metric = Metric::new(key, value, Timestamp::now(), step)?;
        self.store.log_metric(&self.run_id, &metric).await?;
        debug!(run_id = %self.run_id, key = %metric.key, step, "metric logged");
        Ok(metric)
    }
}

/// The owner of an open run.
pub struct ActiveRun {
    info: RunInfo,
    handle: RunHandle,
    finalized: bool,
}

impl ActiveRun {
    pub(crate) fn new(store: Arc<dyn TrackingStore>, info: RunInfo) -> Self {
        let handle = RunHandle {
            store,
            run_id: info.run_id.clone(),
            open: Arc::new(AtomicBool::new(true)),
        };
        Self {
            info,
            handle,
            finalized: false,
        }
    }

    /// Run metadata as returned when the run was created.
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn run_id(&self) -> &RunId {
        &self.info.run_id
    }

    /// A new logging handle for this run.
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    /// Closes the scope and moves the run to `status` on the server.
    ///
    /// Handles stop accepting records before the update is sent, whether or
    /// not the update succeeds.
    pub async fn end(mut self, status: RunStatus) -> Result<RunInfo, TrackingError> {
        self.finalized = true;
        self.handle.open.store(false, Ordering::SeqCst);
        let info = self
            .handle
            .store
            .update_run(&self.info.run_id, status, Timestamp::now())
            .await?;
        info!(run_id = %info.run_id, status = %info.status, "run ended");
        Ok(info)
    }
}

impl std::fmt::Debug for ActiveRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRun")
            .field("info", &self.info)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        self.handle.open.store(false, Ordering::SeqCst);
        warn!(run_id = %self.info.run_id, "run dropped without being ended; marking it killed");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(run_id = %self.info.run_id, "no async runtime available; run left open on the server");
            return;
        };
        let store = Arc::clone(&self.handle.store);
        let run_id = self.info.run_id.clone();
        runtime.spawn(async move {
            if let Err(error) = store
                .update_run(&run_id, RunStatus::Killed, Timestamp::now())
                .await
            {
                warn!(run_id = %run_id, %error, "failed to mark dropped run as killed");
            }
        });
    }
}
