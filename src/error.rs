//! Typed failures surfaced by the store, the transfer codec and the library
//!
//! None of the non-fatal errors leave the store partially mutated: a failed
//! commit discards the working copy, and decode failures happen before any
//! transaction starts.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::EntityKind;

/// Integrity rule broken by a pending transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("user {user} already has a preset named '{name}'")]
    DuplicatePresetName { user: String, name: String },

    #[error("color pair '{0}' exists more than once")]
    DuplicateColorCode(String),

    #[error("effect '{0}' exists more than once")]
    DuplicateEffectName(String),

    #[error("user name '{0}' is used more than once")]
    DuplicateUserName(String),

    #[error("more than one user is marked as owner")]
    MultipleOwners,

    /// NaN and infinities cannot be written to or read from JSON
    #[error("{kind} #{id} has a non-finite {field}")]
    NonFiniteValue {
        kind: EntityKind,
        id: u64,
        field: &'static str,
    },

    #[error("{from} references missing {kind} #{id}")]
    DanglingReference {
        from: String,
        kind: EntityKind,
        id: u64,
    },

    #[error("{kind} #{id} is not owned by exactly one parent ({owners} owners)")]
    OrphanedChild {
        kind: EntityKind,
        id: u64,
        owners: usize,
    },
}

/// Commit rejected; the committed graph is unchanged
#[derive(Debug, Error)]
pub enum SaveFailure {
    #[error("constraint violation: {0}")]
    Constraint(#[from] Violation),

    #[error("failed to persist graph: {0}")]
    Persist(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} #{id} not found")]
    NotFound { collection: EntityKind, id: u64 },

    #[error(transparent)]
    Save(#[from] SaveFailure),

    /// Unrecoverable: the binary exits when this happens at startup
    #[error("failed to open store at {path}: {message}")]
    Init { path: PathBuf, message: String },
}

impl StoreError {
    pub fn not_found(collection: EntityKind, id: u64) -> Self {
        StoreError::NotFound { collection, id }
    }

    pub fn is_save_failure(&self) -> bool {
        matches!(self, StoreError::Save(_))
    }
}

impl From<Violation> for StoreError {
    fn from(violation: Violation) -> Self {
        StoreError::Save(SaveFailure::Constraint(violation))
    }
}

/// Import/export failures
#[derive(Debug, Error)]
pub enum TransferError {
    /// Malformed record: wrong structure, wrong types or bad base64
    #[error("failed to decode preset file: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode preset: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("access denied to {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background read did not complete")]
    WorkerLost,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Map an I/O error on a picked file, keeping permission problems distinct
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            TransferError::AccessDenied(path)
        } else {
            TransferError::Io { path, source }
        }
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no owner profile has been set up")]
    NoOwner,

    #[error("owner profile '{0}' already exists")]
    OwnerExists(String),

    #[error("no preset named '{0}'")]
    UnknownPreset(String),

    #[error("no color pair '{0}'")]
    UnknownColor(String),

    #[error("no effect named '{0}'")]
    UnknownEffect(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl From<SaveFailure> for LibraryError {
    fn from(failure: SaveFailure) -> Self {
        LibraryError::Store(StoreError::Save(failure))
    }
}
