//! Hash-chained JSONL audit ledger — the reference implementation of
//! FlockMesh's "Audit Ledger Sink" external collaborator (patch/rollback
//! records, policy evaluations, blueprint and remediation runs).

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;

pub use error::AuditError;
pub use event::{AuditAction, AuditEvent};
pub use log::AuditLog;
