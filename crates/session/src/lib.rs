//! Tracking session orchestration.
//!
//! This crate sequences calls between the domain types in [`tracking`] and
//! whatever implements its port traits. It contains no transport code.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | [`TrackingSession`]: one store, one experiment, one invocation |
//! | [`run`] | [`ActiveRun`] scope and [`RunHandle`] logging handles |
//! | [`smoke`] | [`SmokeConfig`] and the [`run_smoke`] procedure |

pub mod run;
pub mod session;
pub mod smoke;

pub use run::{ActiveRun, RunHandle};
pub use session::{TrackingSession, INVOCATION_TAG, SOURCE_NAME_TAG, SOURCE_TYPE_TAG};
pub use smoke::{
    run_smoke, SmokeConfig, SmokeReport, DEFAULT_METRIC_KEY, DEFAULT_METRIC_VALUE,
    DEFAULT_PARAM_KEY, DEFAULT_PARAM_VALUE, DEFAULT_REPO_NAME, DEFAULT_REPO_OWNER,
    DEFAULT_TRACKING_URI,
};
