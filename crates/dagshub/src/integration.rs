//! [`DagsHubIntegration`]: the [`RepositoryIntegration`] implementation.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use tracking::{
    BridgeOptions, Credentials, IntegrationBinding, RepositoryIntegration, RepositorySlug,
    TrackingError, TrackingUri,
};

use crate::options::{DagsHubOptions, TOKEN_ENV};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Subset of the repository document returned by `GET /api/v1/repos/{owner}/{repo}`.
#[derive(Debug, Deserialize)]
struct WireRepository {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    private: bool,
}

#[derive(Debug)]
pub struct DagsHubIntegration {
    http: reqwest::Client,
    options: DagsHubOptions,
}

impl DagsHubIntegration {
    pub fn new(options: DagsHubOptions) -> Result<Self, TrackingError> {
        options.validate()?;
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .user_agent(concat!("dagshub-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackingError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, options })
    }

    /// Tracking endpoint DagsHub serves for `repository`.
    pub fn tracking_uri_for(&self, repository: &RepositorySlug) -> Result<TrackingUri, TrackingError> {
        tracking_uri_for(&self.options.host, repository)
    }

    #[instrument(skip(self), fields(repository = %repository))]
    async fn check_repository(&self, repository: &RepositorySlug) -> Result<(), TrackingError> {
        let url = repository_api_url(&self.options.host, repository)?;
        let mut request = self.http.get(url);
        if let Some(token) = &self.options.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| TrackingError::Transport {
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| TrackingError::Transport {
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(error_from_response(repository, status, &body));
        }

        let repo: WireRepository =
            serde_json::from_str(&body).map_err(|e| TrackingError::MalformedResponse {
                message: format!("failed to decode repository document: {e}"),
            })?;
        debug!(full_name = %repo.full_name, private = repo.private, "repository found");
        Ok(())
    }
}

#[async_trait]
impl RepositoryIntegration for DagsHubIntegration {
    #[instrument(skip(self), fields(host = %self.options.host))]
    async fn bind(
        &self,
        repository: &RepositorySlug,
        bridge: BridgeOptions,
    ) -> Result<IntegrationBinding, TrackingError> {
        if bridge.mlflow && self.options.token.is_none() {
            return Err(TrackingError::Unauthorized {
                message: format!(
                    "bridging experiment tracking through DagsHub needs an access token; set {TOKEN_ENV}"
                ),
            });
        }

        self.check_repository(repository).await?;

        let (tracking_uri, credentials) = match (bridge.mlflow, &self.options.token) {
            (true, Some(token)) => (
                Some(self.tracking_uri_for(repository)?),
                Some(Credentials::Basic {
                    username: token.clone(),
                    password: String::new(),
                }),
            ),
            _ => (None, None),
        };
        info!(
            repository = %repository,
            tracking_uri = tracking_uri.as_ref().map(|u| u.as_str()),
            "DagsHub repository bound"
        );
        Ok(IntegrationBinding {
            repository: repository.clone(),
            tracking_uri,
            credentials,
        })
    }
}

fn with_segments<'a>(
    host: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, TrackingError> {
    let mut url = host.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            TrackingError::configuration(format!("DagsHub host '{host}' cannot carry a path"))
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn repository_api_url(host: &Url, repository: &RepositorySlug) -> Result<Url, TrackingError> {
    with_segments(
        host,
        [
            "api",
            "v1",
            "repos",
            repository.owner.as_str(),
            repository.name.as_str(),
        ],
    )
}

fn tracking_uri_for(host: &Url, repository: &RepositorySlug) -> Result<TrackingUri, TrackingError> {
    let mlflow = format!("{}.mlflow", repository.name);
    let url = with_segments(host, [repository.owner.as_str(), mlflow.as_str()])?;
    TrackingUri::new(url.to_string())
        .ok_or_else(|| TrackingError::configuration("derived tracking URI is empty"))
}

fn error_from_response(repository: &RepositorySlug, status: StatusCode, body: &str) -> TrackingError {
    match status {
        StatusCode::NOT_FOUND => TrackingError::RepositoryNotFound {
            repository: repository.clone(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TrackingError::Unauthorized {
            message: format!("DagsHub rejected access to {repository}: {status}"),
        },
        _ => TrackingError::Api {
            status: status.as_u16(),
            error_code: status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_"),
            message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            retry_after: None,
        },
    }
}
