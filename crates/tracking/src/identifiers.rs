//! Newtype domain identifiers.
//!
//! Every tracking concept that has an identity is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally interchanging, for
//! example, a [`RunId`] with an [`ExperimentId`] even though both are strings
//! on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — server-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a run on the tracking server.
    ///
    /// Assigned by the server when the run is created (32 lowercase hex
    /// characters for MLflow); never generated locally.
    RunId
}

string_id! {
    /// Identifies an experiment on the tracking server.
    ///
    /// The default experiment every tracking server provisions is `"0"`.
    ExperimentId
}

impl ExperimentId {
    /// The experiment runs land in when no experiment has been selected.
    pub fn default_experiment() -> Self {
        Self("0".to_string())
    }
}

// ---------------------------------------------------------------------------
// Identifiers — caller-supplied
// ---------------------------------------------------------------------------

string_id! {
    /// Human-readable run name. The server picks one when absent.
    RunName
}

string_id! {
    /// Network address of the tracking service (e.g.
    /// `"https://dagshub.com/owner/repo.mlflow"`).
    ///
    /// Only emptiness is checked here; adapters parse and reject malformed
    /// URLs when they are constructed.
    TrackingUri
}

string_id! {
    /// Owner (user or organisation) of a hosted repository.
    RepoOwner
}

string_id! {
    /// Name of a hosted repository, without the owner prefix.
    RepoName
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single process invocation.
///
/// Generated fresh for every CLI invocation; propagated through spans and
/// attached to the run as a tag so all activity from one invocation can be
/// correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an [`InvocationId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
