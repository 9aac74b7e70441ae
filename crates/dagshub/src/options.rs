//! Connection settings for [`crate::DagsHubIntegration`].

use std::time::Duration;

use reqwest::Url;
use tracking::TrackingError;

pub const DEFAULT_HOST: &str = "https://dagshub.com";

/// Environment variable holding the user's access token.
pub const TOKEN_ENV: &str = "DAGSHUB_USER_TOKEN";
/// Environment variable overriding the DagsHub host (self-hosted deployments).
pub const HOST_ENV: &str = "DAGSHUB_CLIENT_HOST";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, PartialEq)]
pub struct DagsHubOptions {
    pub host: Url,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for DagsHubOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagsHubOptions")
            .field("host", &self.host.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DagsHubOptions {
    /// Options for `host` with no token.
    pub fn new(host: &str) -> Result<Self, TrackingError> {
        Ok(Self {
            host: parse_host(host)?,
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = normalize_token(Some(token.into()));
        self
    }

    /// Reads [`TOKEN_ENV`] and [`HOST_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, TrackingError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`DagsHubOptions::from_env`], with an injectable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackingError> {
        let host = lookup(HOST_ENV)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut options = Self::new(&host)?;
        options.token = normalize_token(lookup(TOKEN_ENV));
        Ok(options)
    }

    pub(crate) fn validate(&self) -> Result<(), TrackingError> {
        if self.request_timeout.is_zero() {
            return Err(TrackingError::configuration(
                "request_timeout must be greater than 0",
            ));
        }
        if !matches!(self.host.scheme(), "http" | "https") || self.host.host_str().is_none() {
            return Err(TrackingError::configuration(format!(
                "DagsHub host '{}' must be an http(s) URL",
                self.host
            )));
        }
        Ok(())
    }
}

fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_host(host: &str) -> Result<Url, TrackingError> {
    let url = Url::parse(host.trim())
        .map_err(|e| TrackingError::configuration(format!("invalid DagsHub host '{host}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(TrackingError::configuration(format!(
            "DagsHub host '{host}' must be an http(s) URL"
        )));
    }
    Ok(url)
}
