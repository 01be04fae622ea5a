// preview.rs — Blueprint Preview Builder.
//
// Projects a kit + a pool of connector manifests + a policy context into a
// single aggregate preview. Pure apart from the injected `Clock`: no file
// I/O, no locking — callers pass already-loaded kits/manifests and a
// `PolicyLibrary` snapshot.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockmesh_policy::{
    classify, engine, ActionIntent, CapabilityId, PolicyContext, PolicyDecision, PolicyLibrary,
    SideEffect, UserId, WorkspaceId,
};

use crate::clock::Clock;
use crate::error::BlueprintError;
use crate::ids::{ConnectorId, KitId};
use crate::kit::{KitLibrary, RolloutPhase};
use crate::manifest::ConnectorManifest;

/// Where a selected connector landed on the readiness ladder.
/// Ordered worst-to-best; `Ord` here is only used internally to pick the
/// ladder's "current worst" status, not exposed as a public ranking API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Ready,
    Partial,
    NoScopeMatch,
    ManifestMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorPlanItem {
    pub connector_id: ConnectorId,
    pub status: ConnectorStatus,
    pub scopes: Vec<CapabilityId>,
    pub missing_required_capabilities: Vec<CapabilityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintWarning {
    pub code: String,
    pub severity: WarningSeverity,
    pub message: String,
    pub connector_id: Option<ConnectorId>,
    pub capability: Option<CapabilityId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityCoverage {
    pub covered_capabilities: Vec<CapabilityId>,
    pub missing_capabilities: Vec<CapabilityId>,
    pub gap_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProjectionItem {
    pub capability: CapabilityId,
    pub decision: PolicyDecision,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyProjectionSummary {
    pub total: usize,
    pub allow: usize,
    pub escalate: usize,
    pub deny: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProjection {
    pub items: Vec<PolicyProjectionItem>,
    pub summary: PolicyProjectionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalForecast {
    pub total_actions: usize,
    pub escalated_actions: usize,
    pub denied_actions: usize,
    pub max_required_approvals: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlannerMetrics {
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDraft {
    pub name: String,
    pub role: String,
    pub kit_id: KitId,
    pub owners: Vec<UserId>,
}

/// The full aggregate produced by the preview builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBlueprintPreview {
    pub workspace_id: WorkspaceId,
    pub agent_draft: AgentDraft,
    pub connector_plan: Vec<ConnectorPlanItem>,
    pub capability_coverage: CapabilityCoverage,
    pub policy_projection: PolicyProjection,
    pub planner_metrics: PlannerMetrics,
    pub approval_forecast: ApprovalForecast,
    pub rollout: Vec<RolloutPhase>,
    pub warnings: Vec<BlueprintWarning>,
    pub generated_at: DateTime<Utc>,
}

/// Build a preview per 's six-step procedure.
#[allow(clippy::too_many_arguments)]
pub fn build(
    workspace_id: &WorkspaceId,
    kit_id: &KitId,
    owners: &[UserId],
    agent_name: Option<&str>,
    selected_connector_ids: Option<&[ConnectorId]>,
    manifests: &HashMap<ConnectorId, ConnectorManifest>,
    policy_context: &PolicyContext,
    policy_library: &PolicyLibrary,
    kit_library: &KitLibrary,
    clock: &dyn Clock,
) -> Result<AgentBlueprintPreview, BlueprintError> {
    let start = clock.now();

    let kit = kit_library
        .get(kit_id)
        .ok_or_else(|| BlueprintError::KitNotFound(kit_id.to_string()))?;

    tracing::debug!(%workspace_id, %kit_id, "building blueprint preview");

    let selected: Vec<ConnectorId> = match selected_connector_ids {
        Some(ids) => ids.to_vec(),
        None => kit
            .connector_candidates
            .iter()
            .map(|c| c.connector_id.clone())
            .collect(),
    };

    let mut connector_plan = Vec::with_capacity(selected.len());
    let mut warnings = Vec::new();

    for connector_id in &selected {
        let candidate = kit
            .connector_candidates
            .iter()
            .find(|c| &c.connector_id == connector_id);

        let Some(manifest) = manifests.get(connector_id) else {
            warnings.push(BlueprintWarning {
                code: "blueprint.connector.manifest_missing".to_string(),
                severity: WarningSeverity::Critical,
                message: format!("no manifest supplied for connector '{connector_id}'"),
                connector_id: Some(connector_id.clone()),
                capability: None,
            });
            connector_plan.push(ConnectorPlanItem {
                connector_id: connector_id.clone(),
                status: ConnectorStatus::ManifestMissing,
                scopes: Vec::new(),
                missing_required_capabilities: Vec::new(),
            });
            continue;
        };

        if manifest.workspace_id != *workspace_id {
            return Err(BlueprintError::CrossWorkspaceConnector {
                connector_id: connector_id.to_string(),
                manifest_workspace: manifest.workspace_id.to_string(),
                requested_workspace: workspace_id.to_string(),
            });
        }

        let (scopes, missing_required): (Vec<CapabilityId>, Vec<CapabilityId>) = match candidate {
            Some(candidate) => {
                let wanted: BTreeSet<&CapabilityId> = candidate
                    .required_capabilities
                    .iter()
                    .chain(candidate.optional_capabilities.iter())
                    .collect();
                let scopes = manifest
                    .capabilities
                    .iter()
                    .filter(|cap| wanted.contains(cap))
                    .cloned()
                    .collect();
                let missing_required = candidate
                    .required_capabilities
                    .iter()
                    .filter(|rc| !manifest.capabilities.contains(rc))
                    .cloned()
                    .collect();
                (scopes, missing_required)
            }
            None => {
                let goals: BTreeSet<&CapabilityId> = kit.capability_goals.iter().collect();
                let scopes = manifest
                    .capabilities
                    .iter()
                    .filter(|cap| goals.contains(cap))
                    .cloned()
                    .collect();
                (scopes, Vec::new())
            }
        };

        let status = if scopes.is_empty() {
            warnings.push(BlueprintWarning {
                code: "blueprint.connector.no_scope_match".to_string(),
                severity: WarningSeverity::Warning,
                message: format!("connector '{connector_id}' manifest grants no capability this kit wants"),
                connector_id: Some(connector_id.clone()),
                capability: None,
            });
            ConnectorStatus::NoScopeMatch
        } else if !missing_required.is_empty() {
            for missing in &missing_required {
                warnings.push(BlueprintWarning {
                    code: "blueprint.connector.required_capability_missing".to_string(),
                    severity: WarningSeverity::Warning,
                    message: format!(
                        "connector '{connector_id}' manifest is missing required capability '{missing}'"
                    ),
                    connector_id: Some(connector_id.clone()),
                    capability: Some(missing.clone()),
                });
            }
            ConnectorStatus::Partial
        } else {
            ConnectorStatus::Ready
        };

        connector_plan.push(ConnectorPlanItem {
            connector_id: connector_id.clone(),
            status,
            scopes,
            missing_required_capabilities: missing_required,
        });
    }

    let covered_set: BTreeSet<CapabilityId> = connector_plan
        .iter()
        .flat_map(|item| item.scopes.iter().cloned())
        .collect();

    let covered_capabilities: Vec<CapabilityId> = kit
        .capability_goals
        .iter()
        .filter(|c| covered_set.contains(c))
        .cloned()
        .collect();
    let missing_capabilities: Vec<CapabilityId> = kit
        .capability_goals
        .iter()
        .filter(|c| !covered_set.contains(c))
        .cloned()
        .collect();

    for missing in &missing_capabilities {
        warnings.push(BlueprintWarning {
            code: "blueprint.goal.capability_uncovered".to_string(),
            severity: WarningSeverity::Warning,
            message: format!("capability goal '{missing}' is not covered by any selected connector"),
            connector_id: None,
            capability: Some(missing.clone()),
        });
    }

    let capability_coverage = CapabilityCoverage {
        gap_total: missing_capabilities.len(),
        covered_capabilities,
        missing_capabilities,
    };

    let mut items = Vec::with_capacity(capability_coverage.covered_capabilities.len());
    let mut summary = PolicyProjectionSummary::default();

    for capability in &capability_coverage.covered_capabilities {
        let classification = classify(capability);
        let sanitized = capability.as_str().replace('.', "_");
        let idempotency_key = match classification.side_effect {
            SideEffect::Mutation => Some(format!("plan-{workspace_id}-{capability}")),
            SideEffect::None => None,
        };
        let intent = ActionIntent {
            id: format!("act_plan_{sanitized}"),
            run_id: "run_plan_preview".to_string(),
            step_id: format!("plan.{capability}"),
            capability: capability.clone(),
            side_effect: classification.side_effect,
            risk_hint: classification.risk_hint,
            idempotency_key,
            parameters: serde_json::Value::Null,
            target: workspace_id.to_string(),
        };

        let decision = engine::evaluate("run_plan_preview", &intent, policy_context, policy_library);

        summary.total += 1;
        match decision.decision {
            flockmesh_policy::Decision::Allow => summary.allow += 1,
            flockmesh_policy::Decision::Escalate => summary.escalate += 1,
            flockmesh_policy::Decision::Deny => summary.deny += 1,
        }

        items.push(PolicyProjectionItem {
            capability: capability.clone(),
            decision,
        });
    }

    let approval_forecast = ApprovalForecast {
        total_actions: items.len(),
        escalated_actions: summary.escalate,
        denied_actions: summary.deny,
        max_required_approvals: items
            .iter()
            .map(|i| i.decision.required_approvals)
            .max()
            .unwrap_or(0),
    };

    let policy_projection = PolicyProjection { items, summary };

    let agent_draft = AgentDraft {
        name: agent_name.map(str::to_string).unwrap_or_else(|| kit.name.clone()),
        role: kit.role.clone(),
        kit_id: kit.kit_id.clone(),
        owners: owners.to_vec(),
    };

    let end = clock.now();
    let elapsed_ms = (end - start).num_milliseconds().max(0) as u64;

    tracing::info!(
        %workspace_id,
        %kit_id,
        gap_total = capability_coverage.gap_total,
        warnings = warnings.len(),
        "blueprint preview built"
    );

    Ok(AgentBlueprintPreview {
        workspace_id: workspace_id.clone(),
        agent_draft,
        connector_plan,
        capability_coverage,
        policy_projection,
        planner_metrics: PlannerMetrics { elapsed_ms },
        approval_forecast,
        rollout: kit.rollout.clone(),
        warnings,
        generated_at: end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use flockmesh_policy::{Decision, PolicyLibraryHandle, PolicyProfile, PolicyRule, ProfileName};
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
            capabilities: caps.iter().map(|c| CapabilityId::new(*c).unwrap()).collect(),
        }
    }

    fn fixed_clock() -> FixedClock {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();
        FixedClock::new(vec![t1, t2])
    }

    fn baseline_context_and_library() -> (PolicyContext, PolicyLibrary) {
        let handle = PolicyLibraryHandle::new(PolicyLibrary::new());
        let mut rules = BTreeMap::new();
        rules.insert(
            CapabilityId::new("message.send").unwrap(),
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

    /// S5: all four office_ops_core connectors present with full manifests,
    /// baseline policy escalates sends -> no gaps, no critical warnings.
    #[test]
    fn s5_blueprint_happy_path() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let (context, library) = baseline_context_and_library();

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
        manifests.insert(
            ConnectorId::new("con_docs_portal").unwrap(),
            manifest("con_docs_portal", "wsp_acme", "office_system", &["document.read"]),
        );

        let preview = build(
            &workspace_id,
            &KitId::new("kit_office_ops_core").unwrap(),
            &[],
            None,
            None,
            &manifests,
            &context,
            &library,
            &kit_library,
            &fixed_clock(),
        )
        .unwrap();

        assert_eq!(preview.capability_coverage.gap_total, 0);
        assert!(preview
            .connector_plan
            .iter()
            .all(|item| item.status == ConnectorStatus::Ready));
        assert!(!warnings_have_critical(&preview.warnings));
        assert_eq!(preview.policy_projection.summary.escalate, 1);
        assert_eq!(preview.policy_projection.summary.deny, 0);
        assert_eq!(preview.planner_metrics.elapsed_ms, 1000);
    }

    fn warnings_have_critical(warnings: &[BlueprintWarning]) -> bool {
        warnings.iter().any(|w| w.severity == WarningSeverity::Critical)
    }

    #[test]
    fn manifest_missing_connector_yields_critical_warning() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let (context, library) = baseline_context_and_library();
        let manifests = HashMap::new();

        let preview = build(
            &workspace_id,
            &KitId::new("kit_office_ops_core").unwrap(),
            &[],
            None,
            Some(&[ConnectorId::new("con_feishu_official").unwrap()]),
            &manifests,
            &context,
            &library,
            &kit_library,
            &fixed_clock(),
        )
        .unwrap();

        assert_eq!(preview.connector_plan[0].status, ConnectorStatus::ManifestMissing);
        assert!(warnings_have_critical(&preview.warnings));
    }

    #[test]
    fn cross_workspace_manifest_is_rejected() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let (context, library) = baseline_context_and_library();

        let mut manifests = HashMap::new();
        manifests.insert(
            ConnectorId::new("con_feishu_official").unwrap(),
            manifest("con_feishu_official", "wsp_other", "office_channel", &["message.read"]),
        );

        let result = build(
            &workspace_id,
            &KitId::new("kit_office_ops_core").unwrap(),
            &[],
            None,
            Some(&[ConnectorId::new("con_feishu_official").unwrap()]),
            &manifests,
            &context,
            &library,
            &kit_library,
            &fixed_clock(),
        );

        assert!(matches!(result, Err(BlueprintError::CrossWorkspaceConnector { .. })));
    }

    #[test]
    fn partial_connector_reports_missing_required_capabilities() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = wsp("wsp_acme");
        let (context, library) = baseline_context_and_library();

        let mut manifests = HashMap::new();
        manifests.insert(
            ConnectorId::new("con_feishu_official").unwrap(),
            manifest("con_feishu_official", "wsp_acme", "office_channel", &["message.read"]),
        );

        let preview = build(
            &workspace_id,
            &KitId::new("kit_office_ops_core").unwrap(),
            &[],
            None,
            Some(&[ConnectorId::new("con_feishu_official").unwrap()]),
            &manifests,
            &context,
            &library,
            &kit_library,
            &fixed_clock(),
        )
        .unwrap();

        assert_eq!(preview.connector_plan[0].status, ConnectorStatus::Partial);
        assert_eq!(preview.connector_plan[0].missing_required_capabilities.len(), 1);
    }
}
