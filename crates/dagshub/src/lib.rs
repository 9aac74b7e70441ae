//! DagsHub repository integration.
//!
//! Implements the [`tracking::RepositoryIntegration`] trait for DagsHub: it
//! confirms the repository exists through the DagsHub API and, when asked to
//! bridge experiment tracking, hands back the repository's `.mlflow`
//! endpoint together with token credentials for it.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Token
//! discovery, host selection and DagsHub's URL layout are handled here; the
//! `session` crate never sees them.
//!
//! Interactive login flows are not supported: a token must be supplied via
//! [`options::TOKEN_ENV`] or [`DagsHubOptions::with_token`].

pub mod integration;
pub mod options;

pub use integration::DagsHubIntegration;
pub use options::DagsHubOptions;
