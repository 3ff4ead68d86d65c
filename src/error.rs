//! Error types.

use crate::diff::Era;
use crate::fieldpath::Path;
use crate::identity::Identity;
use crate::value::Composite;
use std::fmt;
use thiserror::Error;

/// Error is every failure the engine reports. None of them are retried or
/// patched over internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot snapshot a {kind} value: expected an object or array")]
    NotComposite { kind: &'static str },

    #[error("{era} root has no identity: take a snapshot first")]
    MissingIdentity { era: Era },

    #[error("roots do not share an identity: former {former}, present {present}")]
    RootMismatch { former: Identity, present: Identity },

    #[error(transparent)]
    Conflict(Box<IdentityConflict>),

    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("no plugin named '{0}' is registered")]
    UnknownPlugin(String),

    #[error("{path}: {reason}")]
    InvalidPath { path: Path, reason: String },

    #[error("{path}: cycle cannot be serialized")]
    Cycle { path: Path },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates an invalid path error.
    pub fn invalid_path(path: Path, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path,
            reason: reason.into(),
        }
    }

    /// Returns the identity conflict if this is one.
    pub fn as_conflict(&self) -> Option<&IdentityConflict> {
        match self {
            Error::Conflict(c) => Some(c),
            _ => None,
        }
    }
}

/// IdentityConflict reports two different instances carrying the same
/// identity within one revision.
///
/// This usually means two unrelated partial snapshots that share a
/// sub-object were mixed into one graph.
#[derive(Debug, Clone)]
pub struct IdentityConflict {
    /// The revision in which both instances were found.
    pub era: Era,
    pub identity: Identity,
    /// Path to the instance seen first.
    pub first_path: Path,
    /// Path to the instance seen second.
    pub second_path: Path,
    pub first: Composite,
    pub second: Composite,
}

impl fmt::Display for IdentityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "identity conflict in {} graph: {} is carried by different instances at {} and {}",
            self.era, self.identity, self.first_path, self.second_path
        )
    }
}

impl std::error::Error for IdentityConflict {}

impl From<IdentityConflict> for Error {
    fn from(conflict: IdentityConflict) -> Self {
        Error::Conflict(Box::new(conflict))
    }
}
