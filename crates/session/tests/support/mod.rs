#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracking::{
    BridgeOptions, CreateRun, Credentials, ExperimentId, IntegrationBinding, Metric, Param,
    RepositoryIntegration, RepositorySlug, RunId, RunInfo, RunRecord, RunStatus, Timestamp,
    TrackingError, TrackingStore, TrackingUri,
};

/// Which store call should fail on its next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    LogParam,
    LogMetric,
    UpdateRun,
}

#[derive(Default)]
struct FakeState {
    experiments: HashMap<String, ExperimentId>,
    runs: Vec<RunRecord>,
    next_run: u64,
    fail_on: Option<FailOn>,
    endpoint_at_create: Vec<TrackingUri>,
    credentials: Option<Credentials>,
}

/// In-memory tracking server shared between store instances so several
/// "invocations" can be observed against one backend.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, tracking_uri: &TrackingUri, credentials: Option<Credentials>) -> Arc<dyn TrackingStore> {
        self.state.lock().expect("fake backend poisoned").credentials = credentials;
        Arc::new(FakeStore {
            tracking_uri: tracking_uri.clone(),
            backend: self.clone(),
        })
    }

    pub fn fail_on(&self, call: FailOn) {
        self.state.lock().expect("fake backend poisoned").fail_on = Some(call);
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.state.lock().expect("fake backend poisoned").runs.clone()
    }

    pub fn run(&self, run_id: &RunId) -> RunRecord {
        self.runs()
            .into_iter()
            .find(|r| &r.info.run_id == run_id)
            .expect("run should exist")
    }

    pub fn endpoints_at_create(&self) -> Vec<TrackingUri> {
        self.state
            .lock()
            .expect("fake backend poisoned")
            .endpoint_at_create
            .clone()
    }

    pub fn last_credentials(&self) -> Option<Credentials> {
        self.state.lock().expect("fake backend poisoned").credentials.clone()
    }

    pub fn experiment_count(&self) -> usize {
        self.state.lock().expect("fake backend poisoned").experiments.len()
    }

    fn take_failure(state: &mut FakeState, call: FailOn) -> Result<(), TrackingError> {
        if state.fail_on == Some(call) {
            state.fail_on = None;
            return Err(TrackingError::Api {
                status: 500,
                error_code: "INTERNAL_ERROR".into(),
                message: format!("injected failure on {call:?}"),
                retry_after: None,
            });
        }
        Ok(())
    }
}

struct FakeStore {
    tracking_uri: TrackingUri,
    backend: FakeBackend,
}

fn open_run<'a>(state: &'a mut FakeState, run_id: &RunId) -> Result<&'a mut RunRecord, TrackingError> {
    let run = state
        .runs
        .iter_mut()
        .find(|r| &r.info.run_id == run_id)
        .ok_or_else(|| TrackingError::Api {
            status: 404,
            error_code: "RESOURCE_DOES_NOT_EXIST".into(),
            message: format!("run {run_id} not found"),
            retry_after: None,
        })?;
    if run.info.status.is_terminal() {
        return Err(TrackingError::Api {
            status: 400,
            error_code: "INVALID_STATE".into(),
            message: format!("run {run_id} is not active"),
            retry_after: None,
        });
    }
    Ok(run)
}

#[async_trait]
impl TrackingStore for FakeStore {
    fn tracking_uri(&self) -> &TrackingUri {
        &self.tracking_uri
    }

    async fn get_experiment_by_name(&self, name: &str) -> Result<ExperimentId, TrackingError> {
        let state = self.backend.state.lock().expect("fake backend poisoned");
        state.experiments.get(name).cloned().ok_or_else(|| TrackingError::Api {
            status: 404,
            error_code: "RESOURCE_DOES_NOT_EXIST".into(),
            message: format!("experiment '{name}' not found"),
            retry_after: None,
        })
    }

    async fn create_experiment(&self, name: &str) -> Result<ExperimentId, TrackingError> {
        let mut state = self.backend.state.lock().expect("fake backend poisoned");
        let id = ExperimentId::new((state.experiments.len() + 1).to_string())
            .expect("non-empty id");
        state.experiments.insert(name.to_string(), id.clone());
        Ok(id)
    }

    async fn create_run(&self, request: CreateRun) -> Result<RunInfo, TrackingError> {
        let mut state = self.backend.state.lock().expect("fake backend poisoned");
        state.next_run += 1;
        let run_id = RunId::new(format!("{:032x}", state.next_run)).expect("non-empty id");
        let info = RunInfo {
            run_id,
            experiment_id: request.experiment_id,
            run_name: request.run_name,
            status: RunStatus::Running,
            start_time: request.start_time,
            end_time: None,
        };
        state.endpoint_at_create.push(self.tracking_uri.clone());
        state.runs.push(RunRecord {
            info: info.clone(),
            params: Vec::new(),
            metrics: Vec::new(),
            tags: request.tags,
        });
        Ok(info)
    }

    async fn log_param(&self, run_id: &RunId, param: &Param) -> Result<(), TrackingError> {
        let mut state = self.backend.state.lock().expect("fake backend poisoned");
        FakeBackend::take_failure(&mut state, FailOn::LogParam)?;
        open_run(&mut state, run_id)?.params.push(param.clone());
        Ok(())
    }

    async fn log_metric(&self, run_id: &RunId, metric: &Metric) -> Result<(), TrackingError> {
        let mut state = self.backend.state.lock().expect("fake backend poisoned");
        FakeBackend::take_failure(&mut state, FailOn::LogMetric)?;
        open_run(&mut state, run_id)?.metrics.push(metric.clone());
        Ok(())
    }

    async fn update_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        end_time: Timestamp,
    ) -> Result<RunInfo, TrackingError> {
        let mut state = self.backend.state.lock().expect("fake backend poisoned");
        FakeBackend::take_failure(&mut state, FailOn::UpdateRun)?;
        let run = open_run(&mut state, run_id)?;
        run.info.status = status;
        if status.is_terminal() {
            run.info.end_time = Some(end_time);
        }
        Ok(run.info.clone())
    }

    async fn get_run(&self, run_id: &RunId) -> Result<RunRecord, TrackingError> {
        let state = self.backend.state.lock().expect("fake backend poisoned");
        state
            .runs
            .iter()
            .find(|r| &r.info.run_id == run_id)
            .cloned()
            .ok_or_else(|| TrackingError::Api {
                status: 404,
                error_code: "RESOURCE_DOES_NOT_EXIST".into(),
                message: format!("run {run_id} not found"),
                retry_after: None,
            })
    }
}

/// Repository host that knows a fixed set of repositories.
pub struct FakeIntegration {
    pub known: Vec<RepositorySlug>,
    pub tracking_uri: Option<TrackingUri>,
    pub token: String,
}

impl FakeIntegration {
    pub fn knowing(repository: RepositorySlug, tracking_uri: &str) -> Self {
        Self {
            known: vec![repository],
            tracking_uri: TrackingUri::new(tracking_uri),
            token: "test-token".into(),
        }
    }
}

#[async_trait]
impl RepositoryIntegration for FakeIntegration {
    async fn bind(
        &self,
        repository: &RepositorySlug,
        bridge: BridgeOptions,
    ) -> Result<IntegrationBinding, TrackingError> {
        if !self.known.contains(repository) {
            return Err(TrackingError::RepositoryNotFound {
                repository: repository.clone(),
            });
        }
        let (tracking_uri, credentials) = if bridge.mlflow {
            (
                self.tracking_uri.clone(),
                Some(Credentials::Basic {
                    username: self.token.clone(),
                    password: String::new(),
                }),
            )
        } else {
            (None, None)
        };
        Ok(IntegrationBinding {
            repository: repository.clone(),
            tracking_uri,
            credentials,
        })
    }
}
