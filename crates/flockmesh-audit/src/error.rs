// error.rs — error types for the audit ledger.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting or verifying the audit ledger.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to append event: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("integrity check failed at line {line}: expected previous_hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },
}
