// lint.rs — Lint Reporter.
//
// Scores a preview across four fixed gates. Pure function of a preview: no
// I/O, no mutation.

use serde::{Deserialize, Serialize};

use crate::preview::{AgentBlueprintPreview, ConnectorStatus, WarningSeverity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub status: LintStatus,
    pub score_impact: i32,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintGates {
    pub connector_manifest_integrity: GateResult,
    pub capability_coverage: GateResult,
    pub policy_decision_safety: GateResult,
    pub warning_budget: GateResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBlueprintLintReport {
    pub gates: LintGates,
    pub score: u8,
    pub status: LintStatus,
    pub recommendations: Vec<String>,
}

/// Score `preview` across the four gates and roll up an
/// overall status and score.
pub fn lint(preview: &AgentBlueprintPreview) -> AgentBlueprintLintReport {
    let connector_manifest_integrity = connector_manifest_integrity_gate(preview);
    let capability_coverage = capability_coverage_gate(preview);
    let policy_decision_safety = policy_decision_safety_gate(preview);
    let warning_budget = warning_budget_gate(preview);

    let score_impact = connector_manifest_integrity.score_impact
        + capability_coverage.score_impact
        + policy_decision_safety.score_impact
        + warning_budget.score_impact;
    let score = (100 + score_impact).clamp(0, 100) as u8;

    let statuses = [
        connector_manifest_integrity.status,
        capability_coverage.status,
        policy_decision_safety.status,
        warning_budget.status,
    ];
    let status = if statuses.contains(&LintStatus::Fail) {
        LintStatus::Fail
    } else if statuses.contains(&LintStatus::Warn) {
        LintStatus::Warn
    } else {
        LintStatus::Pass
    };

    let recommendations = recommendations_for(
        &connector_manifest_integrity,
        &policy_decision_safety,
        &capability_coverage,
        &warning_budget,
    );

    tracing::info!(score, ?status, "blueprint lint report computed");

    AgentBlueprintLintReport {
        gates: LintGates {
            connector_manifest_integrity,
            capability_coverage,
            policy_decision_safety,
            warning_budget,
        },
        score,
        status,
        recommendations,
    }
}

fn connector_manifest_integrity_gate(preview: &AgentBlueprintPreview) -> GateResult {
    let missing = preview
        .connector_plan
        .iter()
        .filter(|item| item.status == ConnectorStatus::ManifestMissing)
        .count();
    if missing > 0 {
        GateResult {
            status: LintStatus::Fail,
            score_impact: -30,
            detail: format!("{missing} selected connector(s) lack a manifest"),
        }
    } else {
        GateResult {
            status: LintStatus::Pass,
            score_impact: 0,
            detail: "every selected connector has a manifest".to_string(),
        }
    }
}

fn capability_coverage_gate(preview: &AgentBlueprintPreview) -> GateResult {
    let gap = preview.capability_coverage.gap_total;
    if gap == 0 {
        GateResult {
            status: LintStatus::Pass,
            score_impact: 0,
            detail: "all capability goals are covered".to_string(),
        }
    } else if gap <= 2 {
        GateResult {
            status: LintStatus::Warn,
            score_impact: -8,
            detail: format!("{gap} capability goal(s) uncovered"),
        }
    } else {
        GateResult {
            status: LintStatus::Fail,
            score_impact: -18,
            detail: format!("{gap} capability goal(s) uncovered"),
        }
    }
}

fn policy_decision_safety_gate(preview: &AgentBlueprintPreview) -> GateResult {
    let summary = &preview.policy_projection.summary;
    if summary.deny > 0 {
        GateResult {
            status: LintStatus::Fail,
            score_impact: -25,
            detail: format!("{} projected action(s) are denied", summary.deny),
        }
    } else if summary.escalate > 0 {
        GateResult {
            status: LintStatus::Warn,
            score_impact: -6,
            detail: format!("{} projected action(s) require escalation", summary.escalate),
        }
    } else {
        GateResult {
            status: LintStatus::Pass,
            score_impact: 0,
            detail: "every projected action is allowed outright".to_string(),
        }
    }
}

fn warning_budget_gate(preview: &AgentBlueprintPreview) -> GateResult {
    let critical = preview
        .warnings
        .iter()
        .filter(|w| w.severity == WarningSeverity::Critical)
        .count();
    if critical > 0 {
        GateResult {
            status: LintStatus::Fail,
            score_impact: -20,
            detail: format!("{critical} critical warning(s)"),
        }
    } else if preview.warnings.len() > 3 {
        GateResult {
            status: LintStatus::Warn,
            score_impact: -10,
            detail: format!("{} warnings exceed the budget of 3", preview.warnings.len()),
        }
    } else {
        GateResult {
            status: LintStatus::Pass,
            score_impact: 0,
            detail: "warning count is within budget".to_string(),
        }
    }
}

/// Priority order: manifest integrity (nothing else works without a
/// manifest), then denies, then escalates, then coverage gaps, then
/// warning-budget overflow.
fn recommendations_for(
    manifest_integrity: &GateResult,
    policy_decision_safety: &GateResult,
    capability_coverage: &GateResult,
    warning_budget: &GateResult,
) -> Vec<String> {
    let mut recs = Vec::new();

    if manifest_integrity.status == LintStatus::Fail {
        recs.push("attach manifests for every selected connector".to_string());
    }
    if policy_decision_safety.status == LintStatus::Fail {
        recs.push("resolve policy denies before proceeding".to_string());
    } else if policy_decision_safety.status == LintStatus::Warn {
        recs.push("plan approval capacity for escalated actions".to_string());
    }
    if capability_coverage.status != LintStatus::Pass {
        recs.push("add connectors or extend manifests to close capability gaps".to_string());
    }
    if warning_budget.status != LintStatus::Pass {
        recs.push("reduce connector warnings before launch".to_string());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::{ConnectorId, KitId};
    use crate::kit::KitLibrary;
    use crate::manifest::{ConnectorManifest, TrustLevel};
    use chrono::TimeZone;
    use flockmesh_policy::{CapabilityId, Decision, PolicyContext, PolicyLibraryHandle, PolicyProfile, PolicyRule, ProfileName, WorkspaceId};
    use std::collections::{BTreeMap, HashMap};

    fn fixed_clock() -> FixedClock {
        let t1 = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();
        FixedClock::new(vec![t1, t2])
    }

    fn manifest(connector_id: &str, workspace_id: &str, category: &str, caps: &[&str]) -> ConnectorManifest {
        ConnectorManifest {
            connector_id: ConnectorId::new(connector_id).unwrap(),
            workspace_id: WorkspaceId::new(workspace_id).unwrap(),
            category: category.to_string(),
            trust_level: TrustLevel::Standard,
            capabilities: caps.iter().map(|c| CapabilityId::new(*c).unwrap()).collect(),
        }
    }

    /// S5: lint score = 100 - 6 (escalation impact), no deny/coverage/manifest
    /// penalties.
    #[test]
    fn s5_happy_path_lint_score_is_94() {
        let kit_library = KitLibrary::default_library();
        let workspace_id = WorkspaceId::new("wsp_acme").unwrap();

        let handle = PolicyLibraryHandle::new(flockmesh_policy::PolicyLibrary::new());
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
        let library = handle.snapshot();

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

        let preview = crate::preview::build(
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

        let report = lint(&preview);
        assert_eq!(report.score, 94);
        assert_eq!(report.status, LintStatus::Warn);
        assert_eq!(report.gates.policy_decision_safety.status, LintStatus::Warn);
        assert_eq!(report.gates.capability_coverage.status, LintStatus::Pass);
        assert_eq!(report.gates.connector_manifest_integrity.status, LintStatus::Pass);
    }

    #[test]
    fn score_formula_matches_clamp_100_plus_sum() {
        // Three fail/warn gates stacked: -30, -18, -25, -20 would clamp to 0.
        let gates = LintGates {
            connector_manifest_integrity: GateResult { status: LintStatus::Fail, score_impact: -30, detail: String::new() },
            capability_coverage: GateResult { status: LintStatus::Fail, score_impact: -18, detail: String::new() },
            policy_decision_safety: GateResult { status: LintStatus::Fail, score_impact: -25, detail: String::new() },
            warning_budget: GateResult { status: LintStatus::Fail, score_impact: -20, detail: String::new() },
        };
        let sum = gates.connector_manifest_integrity.score_impact
            + gates.capability_coverage.score_impact
            + gates.policy_decision_safety.score_impact
            + gates.warning_budget.score_impact;
        assert_eq!((100 + sum).clamp(0, 100), 7);
    }
}
