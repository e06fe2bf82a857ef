//! Error types for the cache engine.

use crate::codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by cache stores and typed caches.
///
/// Absent and stale records are lookup outcomes, not errors. Decode problems
/// on the read path downgrade to misses, so `Corrupt` only escapes from calls
/// that explicitly ask for strict decoding.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt cache data: {0}")]
    Corrupt(String),

    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaMismatch { found: u16, supported: u16 },

    #[error("timed out after {waited_ms} ms waiting for lock {} (held by {holder})", .path.display())]
    LockTimeout {
        path: PathBuf,
        waited_ms: u64,
        holder: String,
    },

    #[error("fetch failed for key {key}: {source}")]
    FetchFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache is open read-only")]
    ReadOnly,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The item cannot be stored as given (bad field values or oversized data).
    #[error("invalid item: {0}")]
    InvalidItem(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// Stable machine-readable code for scripts and JSON output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Corrupt(_) => "CORRUPT",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::LockTimeout { .. } => "LOCK_TIMEOUT",
            Self::FetchFailed { .. } => "FETCH_FAILED",
            Self::WriteFailed { .. } => "WRITE_FAILED",
            Self::ReadOnly => "READ_ONLY",
            Self::InvalidKey(_) => "INVALID_KEY",
            Self::InvalidItem(_) => "INVALID_ITEM",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

impl From<CodecError> for CacheError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Corrupt(reason) => Self::Corrupt(reason),
            CodecError::SchemaMismatch { found, supported } => {
                Self::SchemaMismatch { found, supported }
            }
        }
    }
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;
