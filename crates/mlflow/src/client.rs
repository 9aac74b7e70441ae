//! [`MlflowClient`]: the [`TrackingStore`] implementation over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use tracking::{
    CreateRun, Credentials, ExperimentId, Metric, Param, RetryPolicy, RunId, RunInfo, RunRecord,
    RunStatus, Timestamp, TrackingError, TrackingStore, TrackingUri,
};

use crate::options::MlflowClientOptions;
use crate::protocol::{self, WireTag};

/// Longest slice of an unparsable error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct MlflowClient {
    http: reqwest::Client,
    base: Url,
    tracking_uri: TrackingUri,
    credentials: Option<Credentials>,
    options: MlflowClientOptions,
}

impl std::fmt::Debug for MlflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlflowClient")
            .field("tracking_uri", &self.tracking_uri)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish()
    }
}

impl MlflowClient {
    /// Builds a client for `tracking_uri`.
    ///
    /// Fails with [`TrackingError::Configuration`] when the URI is not an
    /// `http`/`https` URL or the options are invalid. No request is sent.
    pub fn new(
        tracking_uri: TrackingUri,
        credentials: Option<Credentials>,
        options: MlflowClientOptions,
    ) -> Result<Self, TrackingError> {
        options.validate()?;
        let base = parse_base_url(tracking_uri.as_str())?;
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!("mlflow-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackingError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base,
            tracking_uri,
            credentials,
            options,
        })
    }

    /// Full URL of an API endpoint such as `"runs/create"`.
    pub fn endpoint(&self, path: &str) -> Result<Url, TrackingError> {
        endpoint_url(&self.base, path)
    }

    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, TrackingError> {
        self.send(Method::GET, path, query, None).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, TrackingError> {
        let body = serde_json::to_value(body).map_err(|e| {
            TrackingError::invalid_argument(format!("failed to encode {path} request: {e}"))
        })?;
        self.send(Method::POST, path, &[], Some(&body)).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<R, TrackingError> {
        let url = self.endpoint(path)?;
        let mut attempt = 1;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request = apply_credentials(request, self.credentials.as_ref());

            let err = match send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            match err.retry_policy() {
                RetryPolicy::Retryable { after } if attempt < self.options.max_attempts => {
                    let delay = after
                        .unwrap_or_else(|| self.options.backoff_for(attempt))
                        .min(self.options.max_backoff);
                    warn!(
                        endpoint = path,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "tracking request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => return Err(err),
            }
        }
    }
}

async fn send_once<R: DeserializeOwned>(request: RequestBuilder) -> Result<R, TrackingError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(error_from_response(status, &body, retry_after));
    }
    decode_body(&body)
}

#[async_trait]
impl TrackingStore for MlflowClient {
    fn tracking_uri(&self) -> &TrackingUri {
        &self.tracking_uri
    }

    #[instrument(skip(self))]
    async fn get_experiment_by_name(&self, name: &str) -> Result<ExperimentId, TrackingError> {
        let response: protocol::GetExperimentResponse = self
            .get(protocol::GET_EXPERIMENT_BY_NAME, &[("experiment_name", name)])
            .await?;
        protocol::experiment_id(response.experiment.experiment_id)
    }

    #[instrument(skip(self))]
    async fn create_experiment(&self, name: &str) -> Result<ExperimentId, TrackingError> {
        let response: protocol::CreateExperimentResponse = self
            .post(
                protocol::CREATE_EXPERIMENT,
                &protocol::CreateExperimentRequest { name },
            )
            .await?;
        protocol::experiment_id(response.experiment_id)
    }

    #[instrument(skip(self, request), fields(experiment_id = %request.experiment_id))]
    async fn create_run(&self, request: CreateRun) -> Result<RunInfo, TrackingError> {
        let body = protocol::CreateRunRequest {
            experiment_id: request.experiment_id.as_str(),
            run_name: request.run_name.as_ref().map(|n| n.as_str()),
            start_time: request.start_time.as_millis(),
            tags: request.tags.iter().map(WireTag::from).collect(),
        };
        let response: protocol::RunResponse = self.post(protocol::CREATE_RUN, &body).await?;
        let info = response.run.info.into_domain()?;
        debug!(run_id = %info.run_id, "run created");
        Ok(info)
    }

    #[instrument(skip(self, param), fields(key = %param.key))]
    async fn log_param(&self, run_id: &RunId, param: &Param) -> Result<(), TrackingError> {
        let _: protocol::EmptyResponse = self
            .post(
                protocol::LOG_PARAMETER,
                &protocol::LogParamRequest::new(run_id, param),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, metric), fields(key = %metric.key, step = metric.step))]
    async fn log_metric(&self, run_id: &RunId, metric: &Metric) -> Result<(), TrackingError> {
        let _: protocol::EmptyResponse = self
            .post(
                protocol::LOG_METRIC,
                &protocol::LogMetricRequest::new(run_id, metric),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        end_time: Timestamp,
    ) -> Result<RunInfo, TrackingError> {
        let body = protocol::UpdateRunRequest {
            run_id: run_id.as_str(),
            status,
            end_time: end_time.as_millis(),
        };
        let response: protocol::UpdateRunResponse = self.post(protocol::UPDATE_RUN, &body).await?;
        response.run_info.into_domain()
    }

    #[instrument(skip(self))]
    async fn get_run(&self, run_id: &RunId) -> Result<RunRecord, TrackingError> {
        let response: protocol::RunResponse = self
            .get(protocol::GET_RUN, &[("run_id", run_id.as_str())])
            .await?;
        response.run.into_record()
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

fn parse_base_url(uri: &str) -> Result<Url, TrackingError> {
    let url = Url::parse(uri)
        .map_err(|e| TrackingError::configuration(format!("invalid tracking URI '{uri}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TrackingError::configuration(format!(
            "tracking URI '{uri}' must use http or https"
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TrackingError::configuration(format!(
            "tracking URI '{uri}' has no host"
        )));
    }
    Ok(url)
}

/// Appends `api/2.0/mlflow/<path>` to the base URL's own path.
fn endpoint_url(base: &Url, path: &str) -> Result<Url, TrackingError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            TrackingError::configuration(format!("tracking URI '{base}' cannot carry a path"))
        })?;
        segments.pop_if_empty();
        for segment in protocol::API_PREFIX
            .split('/')
            .chain(path.split('/'))
            .filter(|s| !s.is_empty())
        {
            segments.push(segment);
        }
    }
    Ok(url)
}

fn apply_credentials(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    match credentials {
        None => request,
        Some(Credentials::Basic { username, password }) => {
            request.basic_auth(username, Some(password))
        }
        Some(Credentials::Bearer { token }) => request.bearer_auth(token),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn transport_error(err: reqwest::Error) -> TrackingError {
    if err.is_decode() {
        TrackingError::MalformedResponse {
            message: err.to_string(),
        }
    } else {
        TrackingError::Transport {
            message: err.to_string(),
        }
    }
}

fn error_from_response(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> TrackingError {
    let (error_code, message) = match serde_json::from_str::<protocol::ErrorResponse>(body) {
        Ok(parsed) => (parsed.error_code, parsed.message),
        Err(_) => (String::new(), body.chars().take(MAX_ERROR_BODY_CHARS).collect()),
    };
    let error_code = if error_code.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("UNKNOWN")
            .to_uppercase()
            .replace(' ', "_")
    } else {
        error_code
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return TrackingError::Unauthorized {
            message: format!("{status}: {message}"),
        };
    }
    TrackingError::Api {
        status: status.as_u16(),
        error_code,
        message,
        retry_after,
    }
}

fn decode_body<R: DeserializeOwned>(body: &str) -> Result<R, TrackingError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| TrackingError::MalformedResponse {
        message: format!("failed to decode response: {e}"),
    })
}
