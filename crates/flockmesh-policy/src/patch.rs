// patch.rs — Policy Patch Service.
//
// Dry-run (`simulate`), atomic apply (`patch`), and `rollback`, all gated by
// the admin guard and the optimistic-concurrency hash check. History is
// append-only and chained (`before_hash[n+1] == after_hash[n]`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::{can_actor_manage, PolicyAdminConfig};
use crate::capability::classify;
use crate::context::PolicyContext;
use crate::decision::PolicyDecision;
use crate::engine;
use crate::error::PolicyError;
use crate::ids::{CapabilityId, ProfileName, UserId};
use crate::intent::ActionIntent;
use crate::library::PolicyLibraryHandle;
use crate::profile::PolicyProfile;
use crate::rule::PolicyRule;

/// One capability's rule in a patch request. `rule: None` represents an
/// explicit JSON `null` (requesting removal) — rejected in v0 per open
/// question 1, which recommends requiring an explicit `allow,0` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRuleInput {
    pub capability: CapabilityId,
    pub rule: Option<PolicyRule>,
}

/// A request to patch a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPatch {
    pub patch_id: Uuid,
    pub profile_name: ProfileName,
    pub expected_profile_hash: String,
    pub rules: Vec<PatchRuleInput>,
    pub actor_id: UserId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// One history entry — immutable, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPatchHistoryEntry {
    pub patch_id: Uuid,
    pub profile_name: ProfileName,
    pub before_hash: String,
    pub after_hash: String,
    pub before_snapshot: PolicyProfile,
    pub after_snapshot: PolicyProfile,
    pub actor_id: UserId,
    pub applied_at: DateTime<Utc>,
    pub rollback_of: Option<Uuid>,
}

/// Append-only, in-process patch history. Real durability/replay-export is
/// the external "Audit Ledger Sink" collaborator; this is the
/// in-memory record the Patch Service itself is responsible for keeping
///.
#[derive(Debug, Clone, Default)]
pub struct PatchHistoryLog {
    entries: Vec<PolicyPatchHistoryEntry>,
}

impl PatchHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: PolicyPatchHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, patch_id: Uuid) -> Option<&PolicyPatchHistoryEntry> {
        self.entries.iter().find(|e| e.patch_id == patch_id)
    }

    pub fn history_for(&self, profile_name: &ProfileName) -> Vec<&PolicyPatchHistoryEntry> {
        self.entries
            .iter()
            .filter(|e| &e.profile_name == profile_name)
            .collect()
    }

    pub fn all(&self) -> &[PolicyPatchHistoryEntry] {
        &self.entries
    }

    /// Check that `before_hash[n+1] == after_hash[n]` within one profile's
    /// history.
    pub fn verify_chain(&self, profile_name: &ProfileName) -> bool {
        let entries = self.history_for(profile_name);
        entries
            .windows(2)
            .all(|pair| pair[0].after_hash == pair[1].before_hash)
    }
}

/// Result of `simulate` for one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationItem {
    pub capability: CapabilityId,
    pub current: PolicyDecision,
    pub hypothetical: PolicyDecision,
    pub changed: bool,
}

/// Dry-run comparison of current vs. hypothetical decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySimulationResult {
    pub profile_name: ProfileName,
    pub items: Vec<SimulationItem>,
}

/// Result of a successful `patch` apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProfilePatchResult {
    pub patch_id: Uuid,
    pub before_hash: String,
    pub after_hash: String,
    pub applied_rules_count: usize,
}

/// Build `next_profile` by overlaying `current`'s rules with the patch's
/// rules. Rejects any entry whose `rule` is `None`.
fn overlay_rules(
    current: &BTreeMap<CapabilityId, PolicyRule>,
    patch_rules: &[PatchRuleInput],
) -> Result<BTreeMap<CapabilityId, PolicyRule>, PolicyError> {
    let mut next = current.clone();
    for entry in patch_rules {
        match &entry.rule {
            Some(rule) => {
                let validated = PolicyRule::new(rule.decision, rule.required_approvals).map_err(
                    |err| match err {
                        PolicyError::InvalidRule { reason, .. } => PolicyError::InvalidRule {
                            capability: entry.capability.to_string(),
                            reason,
                        },
                        other => other,
                    },
                )?;
                next.insert(entry.capability.clone(), validated);
            }
            None => {
                return Err(PolicyError::NullRuleUnsupported(entry.capability.to_string()));
            }
        }
    }
    Ok(next)
}

/// The Policy Patch Service. Associated functions rather than an
/// instance because the service itself is stateless — every operation
/// takes the library handle, admin config, and history log explicitly.
pub struct PolicyPatchService;

impl PolicyPatchService {
    /// Dry-run: compute a hypothetical library by cloning and applying
    /// `rules`, and compare decisions for `batch` (or the union of the
    /// current profile's and patch's capability keys if no batch is given).
    /// Never mutates `library`.
    pub fn simulate(
        library: &PolicyLibraryHandle,
        profile_name: &ProfileName,
        rules: &[PatchRuleInput],
        context: &PolicyContext,
        batch: Option<&[ActionIntent]>,
    ) -> Result<PolicySimulationResult, PolicyError> {
        let current_library = library.snapshot();
        let current_profile = current_library
            .get(profile_name)
            .cloned()
            .ok_or_else(|| PolicyError::ProfileNotFound(profile_name.to_string()))?;

        let next_rules = overlay_rules(&current_profile.rules, rules)?;
        let hypothetical_profile = PolicyProfile::new(profile_name.clone(), next_rules);

        let mut hypothetical_library = current_library.clone();
        hypothetical_library.insert(profile_name.clone(), hypothetical_profile);

        let capabilities: Vec<CapabilityId> = match batch {
            Some(intents) => intents.iter().map(|i| i.capability.clone()).collect(),
            None => {
                let mut caps: Vec<CapabilityId> = current_profile.rules.keys().cloned().collect();
                for entry in rules {
                    if !caps.contains(&entry.capability) {
                        caps.push(entry.capability.clone());
                    }
                }
                caps
            }
        };

        let mut items = Vec::with_capacity(capabilities.len());
        for capability in capabilities {
            let classification = classify(&capability);
            let synthetic = ActionIntent {
                id: format!("act_sim_{}", capability.as_str().replace('.', "_")),
                run_id: "run_simulate".to_string(),
                step_id: format!("simulate.{capability}"),
                capability: capability.clone(),
                side_effect: classification.side_effect,
                risk_hint: classification.risk_hint,
                idempotency_key: matches!(
                    classification.side_effect,
                    crate::capability::SideEffect::Mutation
                )
                .then(|| "sim".to_string()),
                parameters: serde_json::Value::Null,
                target: "simulation".to_string(),
            };

            let current = engine::evaluate("run_simulate", &synthetic, context, &current_library);
            let hypothetical =
                engine::evaluate("run_simulate", &synthetic, context, &hypothetical_library);
            let changed = current.decision != hypothetical.decision
                || current.required_approvals != hypothetical.required_approvals;

            items.push(SimulationItem {
                capability,
                current,
                hypothetical,
                changed,
            });
        }

        Ok(PolicySimulationResult {
            profile_name: profile_name.clone(),
            items,
        })
    }

    /// Apply a patch atomically.
    #[allow(clippy::too_many_arguments)]
    pub fn patch(
        library: &PolicyLibraryHandle,
        admin_config: &PolicyAdminConfig,
        history: &mut PatchHistoryLog,
        request: &PolicyPatch,
        now: DateTime<Utc>,
    ) -> Result<PolicyProfilePatchResult, PolicyError> {
        let admin_decision =
            can_actor_manage(admin_config, &request.actor_id, &request.profile_name);
        if !admin_decision.allowed {
            return Err(PolicyError::NotAuthorized {
                actor_id: request.actor_id.to_string(),
                profile_name: request.profile_name.to_string(),
            });
        }

        let mut guard = library.write_guard();
        let current_profile = guard
            .get(&request.profile_name)
            .cloned()
            .ok_or_else(|| PolicyError::ProfileNotFound(request.profile_name.to_string()))?;

        if current_profile.hash != request.expected_profile_hash {
            return Err(PolicyError::HashMismatch {
                expected: request.expected_profile_hash.clone(),
                actual: current_profile.hash.clone(),
            });
        }

        let next_rules = overlay_rules(&current_profile.rules, &request.rules)?;
        let next_profile = PolicyProfile::new(request.profile_name.clone(), next_rules);

        let before_hash = current_profile.hash.clone();
        let after_hash = next_profile.hash.clone();

        tracing::info!(
            profile = %request.profile_name,
            %before_hash,
            %after_hash,
            actor = %request.actor_id,
            "applying policy patch"
        );

        history.append(PolicyPatchHistoryEntry {
            patch_id: request.patch_id,
            profile_name: request.profile_name.clone(),
            before_hash: before_hash.clone(),
            after_hash: after_hash.clone(),
            before_snapshot: current_profile,
            after_snapshot: next_profile.clone(),
            actor_id: request.actor_id.clone(),
            applied_at: now,
            rollback_of: None,
        });

        guard.insert(request.profile_name.clone(), next_profile);

        Ok(PolicyProfilePatchResult {
            patch_id: request.patch_id,
            before_hash,
            after_hash,
            applied_rules_count: request.rules.len(),
        })
    }

    /// Roll a profile back to the `before_snapshot` of a prior patch
    ///.
    pub fn rollback(
        library: &PolicyLibraryHandle,
        admin_config: &PolicyAdminConfig,
        history: &mut PatchHistoryLog,
        profile_name: &ProfileName,
        patch_id: Uuid,
        expected_profile_hash: &str,
        actor_id: &UserId,
        new_patch_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PolicyProfilePatchResult, PolicyError> {
        let admin_decision = can_actor_manage(admin_config, actor_id, profile_name);
        if !admin_decision.allowed {
            return Err(PolicyError::NotAuthorized {
                actor_id: actor_id.to_string(),
                profile_name: profile_name.to_string(),
            });
        }

        let target_entry = history
            .get(patch_id)
            .ok_or_else(|| PolicyError::HistoryEntryNotFound {
                patch_id: patch_id.to_string(),
                profile_name: profile_name.to_string(),
            })?
            .clone();

        let mut guard = library.write_guard();
        let current_profile = guard
            .get(profile_name)
            .cloned()
            .ok_or_else(|| PolicyError::ProfileNotFound(profile_name.to_string()))?;

        if current_profile.hash != expected_profile_hash {
            return Err(PolicyError::HashMismatch {
                expected: expected_profile_hash.to_string(),
                actual: current_profile.hash.clone(),
            });
        }

        let before_hash = current_profile.hash.clone();
        let restored = target_entry.before_snapshot.clone();
        let after_hash = restored.hash.clone();

        tracing::info!(
            profile = %profile_name,
            %patch_id,
            %before_hash,
            %after_hash,
            "rolling back policy patch"
        );

        history.append(PolicyPatchHistoryEntry {
            patch_id: new_patch_id,
            profile_name: profile_name.clone(),
            before_hash: before_hash.clone(),
            after_hash: after_hash.clone(),
            before_snapshot: current_profile,
            after_snapshot: restored.clone(),
            actor_id: actor_id.clone(),
            applied_at: now,
            rollback_of: Some(patch_id),
        });

        guard.insert(profile_name.clone(), restored);

        Ok(PolicyProfilePatchResult {
            patch_id: new_patch_id,
            before_hash,
            after_hash,
            applied_rules_count: 0,
        })
    }
}
