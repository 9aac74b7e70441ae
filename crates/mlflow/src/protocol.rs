//! MLflow REST API 2.0 wire types.
//!
//! Request bodies borrow from domain values; response bodies are owned and
//! converted into domain types through `into_domain` helpers that reject
//! anything the domain would not accept. int64 fields are accepted either as
//! JSON numbers or as decimal strings, since servers differ on which one they
//! emit.

use serde::{Deserialize, Deserializer, Serialize};
use tracking::{
    ExperimentId, Metric, Param, RunId, RunInfo, RunName, RunRecord, RunStatus, RunTag,
    Timestamp, TrackingError,
};

/// Path prefix every endpoint lives under, relative to the tracking URI.
pub const API_PREFIX: &str = "api/2.0/mlflow";

pub const GET_EXPERIMENT_BY_NAME: &str = "experiments/get-by-name";
pub const CREATE_EXPERIMENT: &str = "experiments/create";
pub const CREATE_RUN: &str = "runs/create";
pub const LOG_PARAMETER: &str = "runs/log-parameter";
pub const LOG_METRIC: &str = "runs/log-metric";
pub const UPDATE_RUN: &str = "runs/update";
pub const GET_RUN: &str = "runs/get";

// ---------------------------------------------------------------------------
// Lenient int64
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum WireInt64 {
    Number(i64),
    Text(String),
}

impl WireInt64 {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid int64 string '{s}'"))),
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    WireInt64::deserialize(deserializer)?.into_i64()
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Option::<WireInt64>::deserialize(deserializer)?
        .map(WireInt64::into_i64)
        .transpose()
}

fn malformed(message: impl Into<String>) -> TrackingError {
    TrackingError::MalformedResponse {
        message: message.into(),
    }
}

fn timestamp(field: &str, millis: i64) -> Result<Timestamp, TrackingError> {
    Timestamp::from_millis(millis).ok_or_else(|| malformed(format!("{field} {millis} out of range")))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateExperimentRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WireTag {
    pub key: String,
    pub value: String,
}

impl From<&RunTag> for WireTag {
    fn from(tag: &RunTag) -> Self {
        Self {
            key: tag.key.clone(),
            value: tag.value.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRunRequest<'a> {
    pub experiment_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<&'a str>,
    pub start_time: i64,
    pub tags: Vec<WireTag>,
}

#[derive(Debug, Serialize)]
pub struct LogParamRequest<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> LogParamRequest<'a> {
    pub fn new(run_id: &'a RunId, param: &'a Param) -> Self {
        Self {
            run_id: run_id.as_str(),
            key: param.key.as_str(),
            value: &param.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogMetricRequest<'a> {
    pub run_id: &'a str,
    pub key: &'a str,
    pub value: f64,
    pub timestamp: i64,
    pub step: i64,
}

impl<'a> LogMetricRequest<'a> {
    pub fn new(run_id: &'a RunId, metric: &'a Metric) -> Self {
        Self {
            run_id: run_id.as_str(),
            key: metric.key.as_str(),
            value: metric.value,
            timestamp: metric.timestamp.as_millis(),
            step: metric.step,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateRunRequest<'a> {
    pub run_id: &'a str,
    pub status: RunStatus,
    pub end_time: i64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Body of endpoints that answer `{}`.
#[derive(Debug, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct WireExperiment {
    pub experiment_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GetExperimentResponse {
    pub experiment: WireExperiment,
}

#[derive(Debug, Deserialize)]
pub struct CreateExperimentResponse {
    pub experiment_id: String,
}

pub fn experiment_id(raw: String) -> Result<ExperimentId, TrackingError> {
    ExperimentId::new(raw).ok_or_else(|| malformed("empty experiment_id"))
}

#[derive(Debug, Deserialize)]
pub struct WireRunInfo {
    // Older servers only send the deprecated `run_uuid`.
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub run_uuid: Option<String>,
    pub experiment_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    pub status: RunStatus,
    #[serde(deserialize_with = "lenient_i64")]
    pub start_time: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub end_time: Option<i64>,
}

impl WireRunInfo {
    pub fn into_domain(self) -> Result<RunInfo, TrackingError> {
        let run_id = self
            .run_id
            .filter(|id| !id.is_empty())
            .or(self.run_uuid)
            .and_then(RunId::new)
            .ok_or_else(|| malformed("run info carries no run_id"))?;
        Ok(RunInfo {
            run_id,
            experiment_id: experiment_id(self.experiment_id)?,
            run_name: self.run_name.and_then(RunName::new),
            status: self.status,
            start_time: timestamp("start_time", self.start_time)?,
            end_time: self
                .end_time
                .map(|ms| timestamp("end_time", ms))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireParam {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct WireMetric {
    pub key: String,
    pub value: f64,
    #[serde(deserialize_with = "lenient_i64")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub step: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireRunData {
    #[serde(default)]
    pub params: Vec<WireParam>,
    #[serde(default)]
    pub metrics: Vec<WireMetric>,
    #[serde(default)]
    pub tags: Vec<WireTag>,
}

#[derive(Debug, Deserialize)]
pub struct WireRun {
    pub info: WireRunInfo,
    #[serde(default)]
    pub data: WireRunData,
}

impl WireRun {
    pub fn into_record(self) -> Result<RunRecord, TrackingError> {
        let params = self
            .data
            .params
            .into_iter()
            .map(|p| Param::new(p.key, p.value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(format!("server returned an invalid parameter: {e}")))?;
        let metrics = self
            .data
            .metrics
            .into_iter()
            .map(|m| {
                let ts = timestamp("metric timestamp", m.timestamp)?;
                Metric::new(m.key, m.value, ts, m.step)
                    .map_err(|e| malformed(format!("server returned an invalid metric: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tags = self
            .data
            .tags
            .into_iter()
            .map(|t| RunTag::new(t.key, t.value))
            .collect();
        Ok(RunRecord {
            info: self.info.into_domain()?,
            params,
            metrics,
            tags,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RunResponse {
    pub run: WireRun,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRunResponse {
    pub run_info: WireRunInfo,
}
