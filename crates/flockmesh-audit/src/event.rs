// event.rs — audit event data model.
//
// Every patch, rollback, evaluation, or planning run the control plane cares
// about for compliance purposes is recorded as an `AuditEvent`. Events chain
// via `previous_hash`, so tampering (insertion, deletion, reordering) is
// detectable by re-walking the chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of action this event records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The policy engine evaluated an `ActionIntent`.
    PolicyEvaluate,
    /// A policy patch was applied to a profile.
    PolicyPatchApplied,
    /// A profile was rolled back to a prior history entry.
    PolicyPatchRolledBack,
    /// A blueprint preview was built for a workspace/kit pair.
    BlueprintPreviewBuilt,
    /// A remediation plan was computed.
    RemediationPlanComputed,
}

/// A single audit event — one line in the JSONL ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Who (or what profile/workspace) the event is about.
    pub actor_id: String,
    pub action: AuditAction,
    /// The resource the action concerns, e.g. a profile name or workspace id.
    pub target: Option<String>,
    /// The action's own payload (a `PolicyDecision`, patch result, etc.),
    /// kept as an open JSON value so the ledger doesn't need a dependency on
    /// every crate that produces events.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Hash of the previous event in the log; `None` for the first event.
    pub previous_hash: Option<String>,
}

impl AuditEvent {
    pub fn new(actor_id: impl Into<String>, action: AuditAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp,
            actor_id: actor_id.into(),
            action,
            target: None,
            metadata: serde_json::Value::Null,
            previous_hash: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
