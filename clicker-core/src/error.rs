//! Error taxonomy for the progression store.
//!
//! Each failure kind gets its own value so callers can tell a fresh install apart
//! from a corrupt save apart from a fatal misconfiguration.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Current-schema payload could not be decoded. Always recoverable: the caller
/// falls back to a default `SaveState`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("save payload is not valid UTF-8 after de-obfuscation")]
    InvalidEncoding(#[source] std::str::Utf8Error),
    #[error("save payload is not a well-formed document")]
    Malformed(#[source] serde_json::Error),
    #[error("save schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Filesystem-level failures raised by [`crate::SaveStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("environment variable {var} is not set; cannot locate the save directory")]
    EnvironmentMissing { var: String },
    #[error("could not create save directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not remove {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Only a missing environment is fatal; every other store error leaves the
    /// in-memory model valid.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::EnvironmentMissing { .. })
    }
}

/// Reasons an upgrade purchase is refused. The score is never touched on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("unknown upgrade `{0}`")]
    UnknownUpgrade(String),
    #[error("upgrade `{0}` is already purchased")]
    AlreadyPurchased(String),
    #[error("upgrade `{id}` costs {cost} but only {score} points are available")]
    InsufficientScore { id: String, cost: u64, score: u64 },
}

/// A single legacy decoder rejected the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyDecodeError {
    #[error("payload is not valid UTF-8")]
    InvalidEncoding,
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field `{field}` has an invalid value `{value}`")]
    InvalidField { field: &'static str, value: String },
    #[error("document rejected: {0}")]
    Document(String),
}

/// Failures reported by [`crate::RestoreFlow`].
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("restore was not requested; call request_restore first")]
    NotConfirming,
    #[error("a restore is already being applied")]
    Busy,
    #[error("no legacy backup found")]
    NotFound,
    #[error("legacy backup matched none of the known formats")]
    Decode { attempts: Vec<(crate::LegacyFormat, LegacyDecodeError)> },
    #[error("could not read the legacy backup")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}
