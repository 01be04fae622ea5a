// log.rs — append-only, hash-chained JSONL audit ledger.
//
// One JSON object per line. Each event's `previous_hash` is set to the hash
// of the raw JSON line written before it, so the whole file forms a hash
// chain: tampering with any earlier line breaks every link after it.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::hasher;

/// An append-only audit log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    last_hash: Option<String>,
}

impl AuditLog {
    /// Open (or create) a ledger at `path`, recovering the hash-chain state
    /// from any existing content so new events link correctly.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Append `event` to the log, chaining it to the previous entry.
    pub fn append(&mut self, mut event: AuditEvent) -> Result<(), AuditError> {
        event.previous_hash = self.last_hash.clone();

        let json = serde_json::to_string(&event)?;
        self.last_hash = Some(hasher::hash_str(&json));

        tracing::debug!(event_id = %event.event_id, action = ?event.action, "appending audit event");

        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;

        Ok(())
    }

    /// Read all events from a log file, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }

        Ok(events)
    }

    /// Verify the hash chain of a log file on disk.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut previous_hash: Option<String> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event: AuditEvent = serde_json::from_str(&line)?;
            if event.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: event.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut last_line: Option<String> = None;

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }

        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditAction;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn append_and_read_round_trip() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(AuditEvent::new("org_default", AuditAction::PolicyEvaluate, fixed_now()))
                .unwrap();
            log.append(AuditEvent::new(
                "org_default",
                AuditAction::PolicyPatchApplied,
                fixed_now(),
            ))
            .unwrap();
        }

        let events = AuditLog::read_all(&log_path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::PolicyEvaluate);
        assert_eq!(events[1].action, AuditAction::PolicyPatchApplied);
    }

    #[test]
    fn hash_chain_is_valid() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            for _ in 0..5 {
                log.append(AuditEvent::new("org_default", AuditAction::PolicyEvaluate, fixed_now()))
                    .unwrap();
            }
        }

        assert!(AuditLog::verify_chain(&log_path).unwrap());
    }

    #[test]
    fn first_event_has_no_previous_hash() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(AuditEvent::new("org_default", AuditAction::PolicyEvaluate, fixed_now()))
                .unwrap();
        }

        let events = AuditLog::read_all(&log_path).unwrap();
        assert!(events[0].previous_hash.is_none());
    }

    #[test]
    fn reopen_log_continues_chain() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(AuditEvent::new("org_default", AuditAction::PolicyEvaluate, fixed_now()))
                .unwrap();
        }
        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(AuditEvent::new(
                "org_default",
                AuditAction::PolicyPatchApplied,
                fixed_now(),
            ))
            .unwrap();
        }

        assert!(AuditLog::verify_chain(&log_path).unwrap());
        assert_eq!(AuditLog::read_all(&log_path).unwrap().len(), 2);
    }

    #[test]
    fn tampered_line_breaks_chain_verification() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(AuditEvent::new("org_default", AuditAction::PolicyEvaluate, fixed_now()))
                .unwrap();
            log.append(AuditEvent::new(
                "org_default",
                AuditAction::PolicyPatchApplied,
                fixed_now(),
            ))
            .unwrap();
        }

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let tampered = contents.replace("org_default", "attacker");
        std::fs::write(&log_path, tampered).unwrap();

        assert!(AuditLog::verify_chain(&log_path).is_err());
    }
}
