// kit.rs — Kit Library.
//
// An `AgentKit` bundles a role, default policies, and connector candidates
// for bootstrapping an agent. Kits are load-time immutable.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use flockmesh_policy::{CapabilityId, ProfileName};

use crate::error::BlueprintError;
use crate::ids::{ConnectorId, KitId, PhaseId, PlaybookId};

/// How much latitude a connector candidate is given once wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Standard,
    Restricted,
    HighControl,
}

/// One connector a kit suggests wiring up, and what it needs from a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorCandidate {
    pub connector_id: ConnectorId,
    pub required_capabilities: Vec<CapabilityId>,
    pub optional_capabilities: Vec<CapabilityId>,
    pub risk_profile: RiskProfile,
}

/// How many approvers a rollout phase expects before it can proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalExpectation {
    None,
    Single,
    SingleOrDual,
    Dual,
}

/// One phase of a kit's suggested rollout plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutPhase {
    pub phase_id: PhaseId,
    pub title: String,
    pub focus: String,
    pub approval_expectation: ApprovalExpectation,
}

/// A template bundling a role, default policies, and connector candidates
/// for bootstrapping an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentKit {
    pub version: String,
    pub kit_id: KitId,
    pub name: String,
    pub description: String,
    pub role: String,
    pub default_policy_profile: ProfileName,
    pub default_playbook_id: PlaybookId,
    pub capability_goals: Vec<CapabilityId>,
    pub connector_candidates: Vec<ConnectorCandidate>,
    pub rollout: Vec<RolloutPhase>,
}

/// The load-time-immutable collection of available kits.
#[derive(Debug, Clone, Default)]
pub struct KitLibrary {
    kits: HashMap<KitId, AgentKit>,
}

impl KitLibrary {
    pub fn get(&self, kit_id: &KitId) -> Option<&AgentKit> {
        self.kits.get(kit_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &AgentKit> {
        self.kits.values()
    }

    /// Scan `dir` for `*.kit.json` files, grounded on the same
    /// `fs::read_dir` + per-file `serde_json::from_str` pattern used to load
    /// goal-run records elsewhere in this codebase. A missing directory
    /// falls back to `default_library()`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, BlueprintError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Self::default_library());
        }

        let entries = fs::read_dir(dir).map_err(|source| BlueprintError::KitDirReadFailed {
            path: dir.display().to_string(),
            source,
        })?;

        let mut kits = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| BlueprintError::KitDirReadFailed {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            let is_kit_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".kit.json"));
            if !is_kit_file {
                continue;
            }

            let contents = fs::read_to_string(&path).map_err(|source| BlueprintError::KitDirReadFailed {
                path: path.display().to_string(),
                source,
            })?;
            let kit: AgentKit =
                serde_json::from_str(&contents).map_err(|source| BlueprintError::KitParseFailed {
                    path: path.display().to_string(),
                    source,
                })?;
            tracing::debug!(kit_id = %kit.kit_id, "loaded kit");
            kits.insert(kit.kit_id.clone(), kit);
        }

        Ok(Self { kits })
    }

    /// The two fixed default kits.
    pub fn default_library() -> Self {
        let mut kits = HashMap::new();
        let office_ops = office_ops_core_kit();
        let incident = incident_commander_kit();
        kits.insert(office_ops.kit_id.clone(), office_ops);
        kits.insert(incident.kit_id.clone(), incident);
        Self { kits }
    }
}

fn cap(s: &str) -> CapabilityId {
    CapabilityId::new(s).expect("built-in capability id is a valid pattern")
}

fn office_ops_core_kit() -> AgentKit {
    AgentKit {
        version: "v0".to_string(),
        kit_id: KitId::new("kit_office_ops_core").unwrap(),
        name: "Office Ops Core".to_string(),
        description: "General-purpose office assistant: reads calendars and messages, sends on request."
            .to_string(),
        role: "office_ops".to_string(),
        default_policy_profile: ProfileName::new("org_default").unwrap(),
        default_playbook_id: PlaybookId::new("pbk_office_ops").unwrap(),
        capability_goals: vec![
            cap("message.read"),
            cap("message.send"),
            cap("calendar.read"),
            cap("tool.list"),
        ],
        connector_candidates: vec![
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_feishu_official").unwrap(),
                required_capabilities: vec![cap("message.read"), cap("message.send")],
                optional_capabilities: vec![],
                risk_profile: RiskProfile::Standard,
            },
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_office_calendar").unwrap(),
                required_capabilities: vec![cap("calendar.read")],
                optional_capabilities: vec![],
                risk_profile: RiskProfile::Standard,
            },
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_mcp_gateway").unwrap(),
                required_capabilities: vec![cap("tool.list")],
                optional_capabilities: vec![cap("tool.read")],
                risk_profile: RiskProfile::Restricted,
            },
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_docs_portal").unwrap(),
                required_capabilities: vec![],
                optional_capabilities: vec![cap("document.read")],
                risk_profile: RiskProfile::Standard,
            },
        ],
        rollout: vec![
            RolloutPhase {
                phase_id: PhaseId::new("phase_pilot").unwrap(),
                title: "Pilot".to_string(),
                focus: "Single owner, read-only workflows only".to_string(),
                approval_expectation: ApprovalExpectation::None,
            },
            RolloutPhase {
                phase_id: PhaseId::new("phase_rollout").unwrap(),
                title: "Rollout".to_string(),
                focus: "Enable message sending with single-approver escalation".to_string(),
                approval_expectation: ApprovalExpectation::Single,
            },
        ],
    }
}

fn incident_commander_kit() -> AgentKit {
    AgentKit {
        version: "v0".to_string(),
        kit_id: KitId::new("kit_incident_commander").unwrap(),
        name: "Incident Commander".to_string(),
        description: "Coordinates incident response: reads and escalates incidents, broadcasts updates."
            .to_string(),
        role: "incident_commander".to_string(),
        default_policy_profile: ProfileName::new("org_restricted").unwrap(),
        default_playbook_id: PlaybookId::new("pbk_incident_response").unwrap(),
        capability_goals: vec![
            cap("incident.read"),
            cap("incident.escalate"),
            cap("message.send"),
        ],
        connector_candidates: vec![
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_incident_bridge").unwrap(),
                required_capabilities: vec![cap("incident.read"), cap("incident.escalate")],
                optional_capabilities: vec![],
                risk_profile: RiskProfile::HighControl,
            },
            ConnectorCandidate {
                connector_id: ConnectorId::new("con_feishu_official").unwrap(),
                required_capabilities: vec![cap("message.send")],
                optional_capabilities: vec![],
                risk_profile: RiskProfile::Standard,
            },
        ],
        rollout: vec![
            RolloutPhase {
                phase_id: PhaseId::new("phase_pilot").unwrap(),
                title: "Pilot".to_string(),
                focus: "Shadow an on-call rotation, escalation requires dual approval".to_string(),
                approval_expectation: ApprovalExpectation::Dual,
            },
            RolloutPhase {
                phase_id: PhaseId::new("phase_rollout").unwrap(),
                title: "Rollout".to_string(),
                focus: "Primary commander role, single-or-dual approval depending on severity"
                    .to_string(),
                approval_expectation: ApprovalExpectation::SingleOrDual,
            },
        ],
    }
}
