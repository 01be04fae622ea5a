// error.rs — error taxonomy for the policy subsystem.

use thiserror::Error;

use crate::ids::IdError;

/// Errors surfaced by policy evaluation, patching, and admin authorization.
///
/// Evaluation itself never returns an `Err` — fail-closed failures surface
/// as a `Deny` decision with a reason code. These variants are
/// for the surrounding operations: validation, patch/rollback preconditions,
/// and internal invariant violations.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    #[error("policy.capability.invalid: '{0}' is not a valid capability")]
    InvalidCapability(String),

    #[error("profile '{0}' not found in policy library")]
    ProfileNotFound(String),

    #[error("policy.patch.hash_mismatch: expected {expected}, found {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("policy.admin.not_authorized: actor '{actor_id}' may not manage profile '{profile_name}'")]
    NotAuthorized {
        actor_id: String,
        profile_name: String,
    },

    #[error("rule for capability '{capability}' is invalid: {reason}")]
    InvalidRule { capability: String, reason: String },

    #[error("null-rule removal is not supported in v0 for capability '{0}'")]
    NullRuleUnsupported(String),

    #[error("no history entry '{patch_id}' found for profile '{profile_name}'")]
    HistoryEntryNotFound {
        patch_id: String,
        profile_name: String,
    },

    #[error("intent '{id}' has side_effect=mutation but no idempotency_key")]
    MutationWithoutIdempotencyKey { id: String },

    #[error("invalid history export signature: {0}")]
    InvalidExportSignature(String),
}
