// remediation.rs — Remediation Planner.
//
// Counterfactual search over connector sets, run-overrides, and policy
// patches. Invokes the preview builder and the policy engine repeatedly
// over transient copy-on-write libraries; no global mutable state is
// touched during search.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use flockmesh_policy::{
    classify, CapabilityId, Decision, EffectiveSource, PolicyContext, PolicyLibrary, PolicyProfile,
    PolicyRule, ProfileName, RiskHint, UserId, WorkspaceId,
};

use crate::clock::Clock;
use crate::error::BlueprintError;
use crate::ids::{ConnectorId, KitId};
use crate::kit::KitLibrary;
use crate::lint::{self, AgentBlueprintLintReport, LintStatus};
use crate::manifest::ConnectorManifest;
use crate::preview::{self, AgentBlueprintPreview, ConnectorStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorRemoval {
    pub connector_id: ConnectorId,
    pub reason_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorAddition {
    pub connector_id: ConnectorId,
    pub covered_missing_capabilities: Vec<CapabilityId>,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCandidateKind {
    PolicyProfilePatch,
    PolicyProfileReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    Manual,
    Informational,
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRuleDraft {
    pub capability: CapabilityId,
    pub decision: Decision,
    pub required_approvals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedEffect {
    pub lint_score_delta: i32,
    pub status_before: LintStatus,
    pub status_after: LintStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCandidate {
    pub kind: PolicyCandidateKind,
    pub profile_name: ProfileName,
    pub effective_source: EffectiveSource,
    pub patch_rules: Vec<PatchRuleDraft>,
    pub applicability: Applicability,
    pub estimated_effect: Option<EstimatedEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalCapacityCandidate {
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOverrideCandidate {
    pub profile_name: ProfileName,
    pub status_delta: i32,
    pub score_delta: i32,
    pub lint_status_before: LintStatus,
    pub lint_status_after: LintStatus,
    pub applicability: Applicability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoFixRequest {
    pub workspace_id: WorkspaceId,
    pub kit_id: KitId,
    pub owners: Vec<UserId>,
    pub agent_name: Option<String>,
    pub selected_connector_ids: Vec<ConnectorId>,
    pub run_override: Option<ProfileName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBlueprintRemediationPlan {
    pub connector_removals: Vec<ConnectorRemoval>,
    pub connector_additions: Vec<ConnectorAddition>,
    pub unresolved_capabilities: Vec<CapabilityId>,
    pub policy_candidates: Vec<PolicyCandidate>,
    pub approval_capacity_candidate: Option<ApprovalCapacityCandidate>,
    pub run_override_candidate: Option<RunOverrideCandidate>,
    pub auto_fix_request: AutoFixRequest,
    pub auto_fix_preview: AgentBlueprintPreview,
    pub auto_fix_lint: AgentBlueprintLintReport,
    pub recommendations: Vec<String>,
}

const GROUPABLE_SOURCES: [EffectiveSource; 4] = [
    EffectiveSource::Org,
    EffectiveSource::Workspace,
    EffectiveSource::Agent,
    EffectiveSource::RunOverride,
];

fn category_weight(category: &str) -> i64 {
    match category {
        "office_system" => 30,
        "office_channel" => 20,
        "agent_protocol" => 10,
        _ => 0,
    }
}

fn trust_weight(trust: &crate::manifest::TrustLevel) -> i64 {
    use crate::manifest::TrustLevel::*;
    match trust {
        Standard => 10,
        Sandbox => 6,
        HighControl => 2,
        Unknown => 0,
    }
}

fn profile_for_source(context: &PolicyContext, source: EffectiveSource) -> Option<ProfileName> {
    match source {
        EffectiveSource::Org => Some(context.org_policy.clone()),
        EffectiveSource::Workspace => Some(context.workspace_policy.clone()),
        EffectiveSource::Agent => Some(context.agent_policy.clone()),
        EffectiveSource::RunOverride => context.run_override.clone(),
        EffectiveSource::Unknown => None,
    }
}

fn patch_rule_for_risk(risk_hint: RiskHint) -> (Decision, u8) {
    match risk_hint {
        RiskHint::R0 | RiskHint::R1 => (Decision::Allow, 0),
        RiskHint::R2 => (Decision::Escalate, 1),
        RiskHint::R3 => (Decision::Escalate, 2),
    }
}

/// Build a hypothetical library with `profile_name`'s rules overlaid by
/// `patch_rules`, leaving the real library untouched ("Cyclic
/// planner/engine coupling").
fn overlay_hypothetical_library(
    library: &PolicyLibrary,
    profile_name: &ProfileName,
    patch_rules: &[PatchRuleDraft],
) -> PolicyLibrary {
    let mut hypothetical = library.clone();
    if let Some(profile) = hypothetical.get(profile_name) {
        let mut rules = profile.rules.clone();
        for draft in patch_rules {
            rules.insert(
                draft.capability.clone(),
                PolicyRule::new(draft.decision, draft.required_approvals)
                    .expect("patch_rule_for_risk only emits valid rules"),
            );
        }
        hypothetical.insert(profile_name.clone(), PolicyProfile::new(profile_name.clone(), rules));
    }
    hypothetical
}

#[allow(clippy::too_many_arguments)]
fn rebuild(
    workspace_id: &WorkspaceId,
    kit_id: &KitId,
    owners: &[UserId],
    agent_name: Option<&str>,
    selected_connector_ids: &[ConnectorId],
    manifests: &HashMap<ConnectorId, ConnectorManifest>,
    context: &PolicyContext,
    library: &PolicyLibrary,
    kit_library: &KitLibrary,
    clock: &dyn Clock,
) -> Result<(AgentBlueprintPreview, AgentBlueprintLintReport), BlueprintError> {
    let preview = preview::build(
        workspace_id,
        kit_id,
        owners,
        agent_name,
        Some(selected_connector_ids),
        manifests,
        context,
        library,
        kit_library,
        clock,
    )?;
    let report = lint::lint(&preview);
    Ok((preview, report))
}

/// Compute a remediation plan over an already-built `preview`/`lint_report`
/// pair.
#[allow(clippy::too_many_arguments)]
pub fn plan(
    workspace_id: &WorkspaceId,
    kit_id: &KitId,
    owners: &[UserId],
    agent_name: Option<&str>,
    selected_connector_ids: &[ConnectorId],
    manifests: &HashMap<ConnectorId, ConnectorManifest>,
    policy_context: &PolicyContext,
    policy_library: &PolicyLibrary,
    kit_library: &KitLibrary,
    preview: &AgentBlueprintPreview,
    lint_report: &AgentBlueprintLintReport,
    clock: &dyn Clock,
) -> Result<AgentBlueprintRemediationPlan, BlueprintError> {
    tracing::debug!(%workspace_id, %kit_id, "computing remediation plan");

    // --- connector removals ---
    let connector_removals: Vec<ConnectorRemoval> = preview
        .connector_plan
        .iter()
        .filter(|item| {
            matches!(
                item.status,
                ConnectorStatus::ManifestMissing | ConnectorStatus::NoScopeMatch
            )
        })
        .map(|item| ConnectorRemoval {
            connector_id: item.connector_id.clone(),
            reason_code: match item.status {
                ConnectorStatus::ManifestMissing => "manifest_missing",
                ConnectorStatus::NoScopeMatch => "no_scope_match",
                _ => unreachable!(),
            }
            .to_string(),
        })
        .collect();

    // --- connector additions: greedy weighted set cover ---
    let selected_set: BTreeSet<&ConnectorId> = selected_connector_ids.iter().collect();
    let mut remaining: BTreeSet<CapabilityId> =
        preview.capability_coverage.missing_capabilities.iter().cloned().collect();
    let mut added_ids: BTreeSet<ConnectorId> = BTreeSet::new();
    let mut connector_additions = Vec::new();

    loop {
        if remaining.is_empty() {
            break;
        }
        let mut best: Option<(ConnectorId, Vec<CapabilityId>, i64)> = None;
        for (id, manifest) in manifests.iter() {
            if selected_set.contains(id) || added_ids.contains(id) {
                continue;
            }
            let covered: Vec<CapabilityId> = manifest
                .capabilities
                .iter()
                .filter(|c| remaining.contains(c))
                .cloned()
                .collect();
            if covered.is_empty() {
                continue;
            }
            let score = 100 * covered.len() as i64 + category_weight(&manifest.category) + trust_weight(&manifest.trust_level);
            let is_better = match &best {
                None => true,
                Some((best_id, _, best_score)) => {
                    score > *best_score || (score == *best_score && id.as_str() < best_id.as_str())
                }
            };
            if is_better {
                best = Some((id.clone(), covered, score));
            }
        }

        match best {
            None => break,
            Some((id, covered, score)) => {
                for cap in &covered {
                    remaining.remove(cap);
                }
                added_ids.insert(id.clone());
                connector_additions.push(ConnectorAddition {
                    connector_id: id,
                    covered_missing_capabilities: covered,
                    score,
                });
            }
        }
    }
    let unresolved_capabilities: Vec<CapabilityId> = remaining.into_iter().collect();

    // --- policy candidates: group denies by effective source ---
    let mut policy_candidates = Vec::new();
    for &source in &GROUPABLE_SOURCES {
        let denied: Vec<&CapabilityId> = preview
            .policy_projection
            .items
            .iter()
            .filter(|item| {
                item.decision.decision == Decision::Deny
                    && item.decision.policy_trace.effective_source == source
            })
            .map(|item| &item.capability)
            .collect();
        if denied.is_empty() {
            continue;
        }
        let Some(profile_name) = profile_for_source(policy_context, source) else {
            continue;
        };

        let patch_rules: Vec<PatchRuleDraft> = denied
            .iter()
            .map(|capability| {
                let (decision, required_approvals) = patch_rule_for_risk(classify(capability).risk_hint);
                PatchRuleDraft {
                    capability: (*capability).clone(),
                    decision,
                    required_approvals,
                }
            })
            .collect();

        if policy_library.get(&profile_name).is_some() {
            let hypothetical = overlay_hypothetical_library(policy_library, &profile_name, &patch_rules);
            let (_, hyp_lint) = rebuild(
                workspace_id,
                kit_id,
                owners,
                agent_name,
                selected_connector_ids,
                manifests,
                policy_context,
                &hypothetical,
                kit_library,
                clock,
            )?;
            policy_candidates.push(PolicyCandidate {
                kind: PolicyCandidateKind::PolicyProfilePatch,
                profile_name,
                effective_source: source,
                patch_rules,
                applicability: Applicability::Manual,
                estimated_effect: Some(EstimatedEffect {
                    lint_score_delta: hyp_lint.score as i32 - lint_report.score as i32,
                    status_before: lint_report.status,
                    status_after: hyp_lint.status,
                }),
            });
        } else {
            policy_candidates.push(PolicyCandidate {
                kind: PolicyCandidateKind::PolicyProfileReview,
                profile_name,
                effective_source: source,
                patch_rules,
                applicability: Applicability::Informational,
                estimated_effect: None,
            });
        }
    }

    let approval_capacity_candidate = if preview.policy_projection.summary.escalate > 0 {
        Some(ApprovalCapacityCandidate {
            note: "escalated actions require approver capacity before rollout".to_string(),
        })
    } else {
        None
    };

    // --- run-override search ---
    let mut best_run_override: Option<(ProfileName, i32, i32, LintStatus)> = None;
    for profile_name in policy_library.keys() {
        if policy_context.run_override.as_ref() == Some(profile_name) {
            continue;
        }
        let candidate_context = policy_context.with_run_override(Some(profile_name.clone()));
        let (_, candidate_lint) = rebuild(
            workspace_id,
            kit_id,
            owners,
            agent_name,
            selected_connector_ids,
            manifests,
            &candidate_context,
            policy_library,
            kit_library,
            clock,
        )?;
        let status_delta = lint_report.status as i32 - candidate_lint.status as i32;
        let score_delta = candidate_lint.score as i32 - lint_report.score as i32;
        let is_better = match &best_run_override {
            None => true,
            Some((_, best_status_delta, best_score_delta, _)) => {
                (status_delta, score_delta) > (*best_status_delta, *best_score_delta)
            }
        };
        if is_better {
            best_run_override = Some((profile_name.clone(), status_delta, score_delta, candidate_lint.status));
        }
    }
    let run_override_candidate = best_run_override
        .filter(|(_, status_delta, score_delta, _)| *status_delta > 0 || *score_delta > 0)
        .map(|(profile_name, status_delta, score_delta, after)| RunOverrideCandidate {
            profile_name,
            status_delta,
            score_delta,
            lint_status_before: lint_report.status,
            lint_status_after: after,
            applicability: Applicability::Direct,
        });

    // --- assemble auto-fix ---
    let removed_ids: BTreeSet<&ConnectorId> = connector_removals.iter().map(|r| &r.connector_id).collect();
    let mut selected_after: Vec<ConnectorId> = selected_connector_ids
        .iter()
        .filter(|id| !removed_ids.contains(id))
        .cloned()
        .collect();
    for addition in &connector_additions {
        selected_after.push(addition.connector_id.clone());
    }

    let adopted_run_override = run_override_candidate
        .as_ref()
        .map(|c| c.profile_name.clone())
        .or_else(|| policy_context.run_override.clone());

    let auto_fix_context = policy_context.with_run_override(adopted_run_override.clone());
    let (auto_fix_preview, auto_fix_lint) = rebuild(
        workspace_id,
        kit_id,
        owners,
        agent_name,
        &selected_after,
        manifests,
        &auto_fix_context,
        policy_library,
        kit_library,
        clock,
    )?;

    let auto_fix_request = AutoFixRequest {
        workspace_id: workspace_id.clone(),
        kit_id: kit_id.clone(),
        owners: owners.to_vec(),
        agent_name: agent_name.map(str::to_string),
        selected_connector_ids: selected_after,
        run_override: adopted_run_override,
    };

    let recommendations = recommendations_for(
        &connector_removals,
        &connector_additions,
        &unresolved_capabilities,
        &policy_candidates,
        &approval_capacity_candidate,
        &run_override_candidate,
    );

    tracing::info!(
        removals = connector_removals.len(),
        additions = connector_additions.len(),
        unresolved = unresolved_capabilities.len(),
        auto_fix_score = auto_fix_lint.score,
        "remediation plan computed"
    );

    Ok(AgentBlueprintRemediationPlan {
        connector_removals,
        connector_additions,
        unresolved_capabilities,
        policy_candidates,
        approval_capacity_candidate,
        run_override_candidate,
        auto_fix_request,
        auto_fix_preview,
        auto_fix_lint,
        recommendations,
    })
}

fn recommendations_for(
    connector_removals: &[ConnectorRemoval],
    connector_additions: &[ConnectorAddition],
    unresolved_capabilities: &[CapabilityId],
    policy_candidates: &[PolicyCandidate],
    approval_capacity_candidate: &Option<ApprovalCapacityCandidate>,
    run_override_candidate: &Option<RunOverrideCandidate>,
) -> Vec<String> {
    let mut recs = Vec::new();

    if !connector_removals.is_empty() {
        recs.push(format!(
            "remove {} connector(s) with broken manifests or no capability overlap",
            connector_removals.len()
        ));
    }
    if !connector_additions.is_empty() {
        recs.push(format!(
            "add {} connector(s) to close capability gaps",
            connector_additions.len()
        ));
    }
    if !unresolved_capabilities.is_empty() {
        let names: Vec<&str> = unresolved_capabilities.iter().map(|c| c.as_str()).collect();
        recs.push(format!("no connector candidate covers: {}", names.join(", ")));
    }
    if !policy_candidates.is_empty() {
        recs.push("review proposed policy patches before applying".to_string());
    }
    if approval_capacity_candidate.is_some() {
        recs.push("ensure approval capacity for escalated actions".to_string());
    }
    if let Some(candidate) = run_override_candidate {
        recs.push(format!(
            "adopt run-override profile '{}' to improve the lint score",
            candidate.profile_name
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RepeatingClock;
    use chrono::TimeZone;
    use flockmesh_policy::{PolicyLibraryHandle, ProfileName};
    use std::collections::BTreeMap;

    fn wsp(s: &str) -> WorkspaceId {
        WorkspaceId::new(s).unwrap()
    }

    fn manifest(connector_id: &str, workspace_id: &str, category: &str, caps: &[&str]) -> ConnectorManifest {
        ConnectorManifest {
            connector_id: ConnectorId::new(connector_id).unwrap(),
            workspace_id: wsp(workspace_id),
            category: category.to_string(),
            trust_level: crate::manifest::TrustLevel::Standard,
            capabilities: caps.iter().map(|c| flockmesh_policy::CapabilityId::new(*c).unwrap()).collect(),
        }
    }

    fn baseline_context_and_library() -> (PolicyContext, PolicyLibrary) {
        let handle = PolicyLibraryHandle::new(PolicyLibrary::new());
        let mut rules = BTreeMap::new();
        rules.insert(
            flockmesh_policy::CapabilityId::new("message.send").unwrap(),
            PolicyRule::new(Decision::Escalate, 1).unwrap(),
        );
        handle.replace(PolicyProfile::new(ProfileName::new("org_default").unwrap(), rules));
        handle.replace(PolicyProfile::new(ProfileName::new("wsp_default").unwrap(), BTreeMap::new()));
        handle.replace(PolicyProfile::new(ProfileName::new("agent_default").unwrap(), BTreeMap::new()));

        let context = PolicyContext {
            org_policy: ProfileName::new("org_default").unwrap(),
            workspace_policy: ProfileName::new("wsp_default").unwrap(),
            agent_policy: ProfileName::new("agent_default").unwrap(),
            run_override: None,
        };
        (context, handle.snapshot())
    }

    fn clock() -> RepeatingClock {
        RepeatingClock(chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    /// S6: only con_feishu_official selected, missing calendar.read and
    /// tool.list. Pool has con_office_calendar and con_mcp_gateway covering
    /// those gaps. Planner adds both -> unresolved empty, auto-fix gap=0.
    #[test]
    fn s6_remediation_closes_the_gap() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let kit_id = KitId::new("kit_office_ops_core").unwrap();
        let (context, library) = baseline_context_and_library();

        let selected = vec![ConnectorId::new("con_feishu_official").unwrap()];
        let mut manifests = HashMap::new();
        manifests.insert(
            ConnectorId::new("con_feishu_official").unwrap(),
            manifest("con_feishu_official", "wsp_acme", "office_channel", &["message.read", "message.send"]),
        );
        manifests.insert(
            ConnectorId::new("con_office_calendar").unwrap(),
            manifest("con_office_calendar", "wsp_acme", "office_system", &["calendar.read"]),
        );
        manifests.insert(
            ConnectorId::new("con_mcp_gateway").unwrap(),
            manifest("con_mcp_gateway", "wsp_acme", "agent_protocol", &["tool.list", "tool.read"]),
        );

        let preview = preview::build(
            &workspace_id,
            &kit_id,
            &[],
            None,
            Some(&selected),
            &manifests,
            &context,
            &library,
            &kit_library,
            &clock(),
        )
        .unwrap();

        assert_eq!(preview.capability_coverage.gap_total, 2);

        let lint_report = lint::lint(&preview);

        let remediation = plan(
            &workspace_id,
            &kit_id,
            &[],
            None,
            &selected,
            &manifests,
            &context,
            &library,
            &kit_library,
            &preview,
            &lint_report,
            &clock(),
        )
        .unwrap();

        assert!(remediation.unresolved_capabilities.is_empty());
        assert_eq!(remediation.connector_additions.len(), 2);
        assert_eq!(remediation.auto_fix_preview.capability_coverage.gap_total, 0);
        assert!(remediation.connector_removals.is_empty());
    }

    #[test]
    fn denied_capability_produces_profile_patch_candidate_when_profile_exists() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let kit_id = KitId::new("kit_office_ops_core").unwrap();

        let handle = PolicyLibraryHandle::new(PolicyLibrary::new());
        let mut rules = BTreeMap::new();
        rules.insert(
            flockmesh_policy::CapabilityId::new("message.send").unwrap(),
            PolicyRule::new(Decision::Deny, 0).unwrap(),
        );
        handle.replace(PolicyProfile::new(ProfileName::new("org_default").unwrap(), rules));
        handle.replace(PolicyProfile::new(ProfileName::new("wsp_default").unwrap(), BTreeMap::new()));
        handle.replace(PolicyProfile::new(ProfileName::new("agent_default").unwrap(), BTreeMap::new()));
        let context = PolicyContext {
            org_policy: ProfileName::new("org_default").unwrap(),
            workspace_policy: ProfileName::new("wsp_default").unwrap(),
            agent_policy: ProfileName::new("agent_default").unwrap(),
            run_override: None,
        };
        let library = handle.snapshot();

        let selected = vec![ConnectorId::new("con_feishu_official").unwrap()];
        let mut manifests = HashMap::new();
        manifests.insert(
            ConnectorId::new("con_feishu_official").unwrap(),
            manifest("con_feishu_official", "wsp_acme", "office_channel", &["message.read", "message.send"]),
        );

        let preview = preview::build(
            &workspace_id,
            &kit_id,
            &[],
            None,
            Some(&selected),
            &manifests,
            &context,
            &library,
            &kit_library,
            &clock(),
        )
        .unwrap();
        let lint_report = lint::lint(&preview);
        assert_eq!(lint_report.gates.policy_decision_safety.status, LintStatus::Fail);

        let remediation = plan(
            &workspace_id,
            &kit_id,
            &[],
            None,
            &selected,
            &manifests,
            &context,
            &library,
            &kit_library,
            &preview,
            &lint_report,
            &clock(),
        )
        .unwrap();

        assert_eq!(remediation.policy_candidates.len(), 1);
        let candidate = &remediation.policy_candidates[0];
        assert_eq!(candidate.kind, PolicyCandidateKind::PolicyProfilePatch);
        assert_eq!(candidate.effective_source, EffectiveSource::Org);
        assert!(candidate.estimated_effect.as_ref().unwrap().lint_score_delta > 0);
    }
}
