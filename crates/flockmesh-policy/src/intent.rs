// intent.rs — ActionIntent and its admission-time invariant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::SideEffect;
use crate::error::PolicyError;
use crate::ids::CapabilityId;

/// A concrete proposal to invoke a capability, pre-execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionIntent {
    pub id: String,
    pub run_id: String,
    pub step_id: String,
    pub capability: CapabilityId,
    pub side_effect: SideEffect,
    pub risk_hint: crate::capability::RiskHint,
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub parameters: Value,
    pub target: String,
}

impl ActionIntent {
    /// Admission-time invariant: `side_effect == Mutation` implies an
    /// `idempotency_key` is present. This is checked by the admission
    /// layer, not during evaluation — `PolicyEngine::evaluate` surfaces the
    /// same condition only as an informational reason code.
    pub fn validate_admission(&self) -> Result<(), PolicyError> {
        if self.side_effect == SideEffect::Mutation && self.idempotency_key.is_none() {
            return Err(PolicyError::MutationWithoutIdempotencyKey { id: self.id.clone() });
        }
        Ok(())
    }

    /// Whether this intent would trip the informational
    /// `policy.intent.mutation_without_idempotency` reason code at
    /// evaluation time.
    pub fn is_mutation_without_idempotency(&self) -> bool {
        self.side_effect == SideEffect::Mutation && self.idempotency_key.is_none()
    }
}
