//! MLflow tracking-server adapter.
//!
//! Implements the [`tracking::TrackingStore`] trait against the MLflow REST
//! API 2.0 (`<tracking-uri>/api/2.0/mlflow/...`), which is what self-hosted
//! MLflow servers and DagsHub's per-repository `.mlflow` endpoints speak.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request encoding, response decoding,
//! status-code mapping, credentials, and exponential back-off live here. The
//! `session` crate sees only [`tracking::TrackingStore`].

pub mod client;
pub mod options;
pub mod protocol;

pub use client::MlflowClient;
pub use options::MlflowClientOptions;
