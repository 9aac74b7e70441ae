//! `dagshub-smoke`: records one parameter and one metric against the
//! project's DagsHub-hosted MLflow endpoint.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: JSON `tracing` output plus an optional OTLP
//!    exporter (see [`observability`]).
//! 2. **Construct infrastructure**: a [`DagsHubIntegration`] from the
//!    environment and an [`MlflowClient`] for the bound endpoint.
//! 3. **Run once**: call [`session::run_smoke`] with the fixed
//!    [`SmokeConfig`] and print the finished run as JSON on stdout.
//!
//! The binary takes no arguments. Any failure exits non-zero with the error
//! chain on stderr.

mod observability;

use std::sync::Arc;

use anyhow::{bail, Context};
use dagshub::{DagsHubIntegration, DagsHubOptions};
use mlflow::{MlflowClient, MlflowClientOptions};
use session::{run_smoke, SmokeConfig};
use tracing::info;
use tracking::TrackingStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ensure_no_arguments(std::env::args().skip(1))?;
    let _observability = observability::init()?;

    let config = SmokeConfig::default();
    config
        .validate()
        .context("invalid smoke-run configuration")?;

    let integration = DagsHubIntegration::new(
        DagsHubOptions::from_env().context("invalid DagsHub settings")?,
    )?;

    let report = run_smoke(&config, &integration, |uri, credentials| {
        let client = MlflowClient::new(uri.clone(), credentials, MlflowClientOptions::default())?;
        Ok(Arc::new(client) as Arc<dyn TrackingStore>)
    })
    .await
    .context("smoke run failed")?;

    info!(
        run_id = %report.run.run_id,
        tracking_uri = %report.tracking_uri,
        status = %report.run.status,
        "parameter and metric recorded"
    );
    println!(
        "{}",
        serde_json::to_string(&report.run).context("failed to encode run summary")?
    );
    Ok(())
}

fn ensure_no_arguments(mut args: impl Iterator<Item = String>) -> anyhow::Result<()> {
    if let Some(arg) = args.next() {
        bail!("dagshub-smoke takes no arguments (got '{arg}')");
    }
    Ok(())
}
