//! The tracking smoke run.
//!
//! Points a session at the configured endpoint, binds the repository
//! integration, opens one run, and records one parameter and one metric in
//! it. Every failure propagates unchanged; nothing is retried here.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use tracking::{
    BridgeOptions, Credentials, Metric, MetricKey, Param, RepoName, RepoOwner,
    RepositoryIntegration, RepositorySlug, RunInfo, RunName, TrackingError, TrackingStore,
    TrackingUri,
};

use crate::session::TrackingSession;

pub const DEFAULT_TRACKING_URI: &str = "https://dagshub.com/Ayush0563/mlops-mini-project.mlflow";
pub const DEFAULT_REPO_OWNER: &str = "Ayush0563";
pub const DEFAULT_REPO_NAME: &str = "mlops-mini-project";
pub const DEFAULT_PARAM_KEY: &str = "parameter name";
pub const DEFAULT_PARAM_VALUE: &str = "value";
pub const DEFAULT_METRIC_KEY: &str = "metric name";
pub const DEFAULT_METRIC_VALUE: f64 = 1.0;

/// What the smoke run logs and where.
///
/// [`SmokeConfig::default`] is the fixed configuration the CLI runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeConfig {
    pub tracking_uri: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub bridge: BridgeOptions,
    /// `None` selects the server's default experiment.
    pub experiment_name: Option<String>,
    /// `None` lets the server pick a run name.
    pub run_name: Option<String>,
    pub param_key: String,
    pub param_value: String,
    pub metric_key: String,
    pub metric_value: f64,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            tracking_uri: DEFAULT_TRACKING_URI.to_string(),
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            bridge: BridgeOptions { mlflow: true },
            experiment_name: None,
            run_name: None,
            param_key: DEFAULT_PARAM_KEY.to_string(),
            param_value: DEFAULT_PARAM_VALUE.to_string(),
            metric_key: DEFAULT_METRIC_KEY.to_string(),
            metric_value: DEFAULT_METRIC_VALUE,
        }
    }
}

/// A [`SmokeConfig`] whose fields have all been parsed.
#[derive(Debug, Clone)]
struct SmokePlan {
    tracking_uri: TrackingUri,
    repository: RepositorySlug,
    run_name: Option<RunName>,
    param: Param,
    metric_key: MetricKey,
}

impl SmokeConfig {
    /// Checks every field without touching the network.
    pub fn validate(&self) -> Result<(), TrackingError> {
        self.plan().map(|_| ())
    }

    fn plan(&self) -> Result<SmokePlan, TrackingError> {
        let tracking_uri = TrackingUri::new(self.tracking_uri.trim())
            .ok_or_else(|| TrackingError::configuration("tracking_uri must not be empty"))?;
        let owner = RepoOwner::new(self.repo_owner.trim())
            .ok_or_else(|| TrackingError::configuration("repo_owner must not be empty"))?;
        let name = RepoName::new(self.repo_name.trim())
            .ok_or_else(|| TrackingError::configuration("repo_name must not be empty"))?;
        if let Some(experiment) = &self.experiment_name {
            if experiment.trim().is_empty() {
                return Err(TrackingError::configuration(
                    "experiment_name must not be blank when set",
                ));
            }
        }
        let run_name = match &self.run_name {
            None => None,
            Some(name) => Some(RunName::new(name.clone()).ok_or_else(|| {
                TrackingError::configuration("run_name must not be empty when set")
            })?),
        };
        let param = Param::new(self.param_key.clone(), self.param_value.clone())?;
        let metric_key = MetricKey::parse(self.metric_key.clone())?;
        if !self.metric_value.is_finite() {
            return Err(TrackingError::configuration("metric_value must be finite"));
        }

        Ok(SmokePlan {
            tracking_uri,
            repository: RepositorySlug::new(owner, name),
            run_name,
            param,
            metric_key,
        })
    }
}

/// What a completed smoke run recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeReport {
    /// Endpoint the run was opened against.
    pub tracking_uri: TrackingUri,
    /// Final state of the run after the scope closed.
    pub run: RunInfo,
    pub param: Param,
    pub metric: Metric,
}

/// Executes the smoke run.
///
/// `connect_store` builds the tracking store for the configured endpoint and
/// the credentials the integration handed back. Those credentials are
/// withheld when the integration bridged a different endpoint.
pub async fn run_smoke<C>(
    config: &SmokeConfig,
    integration: &dyn RepositoryIntegration,
    connect_store: C,
) -> Result<SmokeReport, TrackingError>
where
    C: FnOnce(&TrackingUri, Option<Credentials>) -> Result<Arc<dyn TrackingStore>, TrackingError>,
{
    let plan = config.plan()?;
    let span = info_span!(
        "smoke_run",
        tracking_uri = %plan.tracking_uri,
        repository = %plan.repository,
    );
    execute(config, plan, integration, connect_store)
        .instrument(span)
        .await
}

async fn execute<C>(
    config: &SmokeConfig,
    plan: SmokePlan,
    integration: &dyn RepositoryIntegration,
    connect_store: C,
) -> Result<SmokeReport, TrackingError>
where
    C: FnOnce(&TrackingUri, Option<Credentials>) -> Result<Arc<dyn TrackingStore>, TrackingError>,
{
    let binding = integration.bind(&plan.repository, config.bridge).await?;
    info!(repository = %binding.repository, bridged = binding.tracking_uri.is_some(), "repository integration bound");
    let credentials = match &binding.tracking_uri {
        // Credentials are minted for the bridged endpoint only.
        Some(bridged) if bridged != &plan.tracking_uri => {
            warn!(
                configured = %plan.tracking_uri,
                bridged = %bridged,
                "integration reports a different tracking endpoint; keeping the configured one without its credentials"
            );
            None
        }
        _ => binding.credentials,
    };

    let store = connect_store(&plan.tracking_uri, credentials)?;
    let session = TrackingSession::connect(store, config.experiment_name.as_deref()).await?;

    let Param { key, value } = plan.param;
    let metric_key = plan.metric_key;
    let metric_value = config.metric_value;
    let ((param, metric), run) = session
        .with_run(plan.run_name, |run| async move {
            let param = run.log_param(key.as_str(), value).await?;
            let metric = run.log_metric(metric_key.as_str(), metric_value).await?;
            Ok::<_, TrackingError>((param, metric))
        })
        .await?;

    info!(run_id = %run.run_id, status = %run.status, "smoke run complete");
    Ok(SmokeReport {
        tracking_uri: session.tracking_uri().clone(),
        run,
        param,
        metric,
    })
}
