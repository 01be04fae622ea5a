// decision.rs — PolicyDecision and its evaluation trace.

use serde::{Deserialize, Serialize};

use crate::context::Source;
use crate::ids::ProfileName;
use crate::rule::{Decision, PolicyRule};

/// Which layer (or none) produced the effective decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveSource {
    Org,
    Workspace,
    Agent,
    RunOverride,
    Unknown,
}

impl From<Source> for EffectiveSource {
    fn from(s: Source) -> Self {
        match s {
            Source::Org => EffectiveSource::Org,
            Source::Workspace => EffectiveSource::Workspace,
            Source::Agent => EffectiveSource::Agent,
            Source::RunOverride => EffectiveSource::RunOverride,
        }
    }
}

/// What one layer contributed during evaluation, whether or not it ended up
/// being the effective source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDecision {
    pub source: Source,
    pub profile: Option<ProfileName>,
    pub rule: Option<PolicyRule>,
    pub decision: Decision,
    pub required_approvals: u8,
}

/// Full evaluation trace: every layer considered plus which one won.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTrace {
    pub layer_decisions: Vec<LayerDecision>,
    pub effective_source: EffectiveSource,
    pub effective_profile: Option<ProfileName>,
}

/// The output of `PolicyEngine::evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub decision: Decision,
    pub required_approvals: u8,
    pub reason_codes: Vec<String>,
    pub policy_trace: PolicyTrace,
}
