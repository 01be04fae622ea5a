// context.rs — PolicyContext: the four-layer stack.

use serde::{Deserialize, Serialize};

use crate::ids::ProfileName;

/// The source of a layer, in fixed evaluation order. `run_override` is the
/// only layer that may be absent from a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Org,
    Workspace,
    Agent,
    RunOverride,
}

impl Source {
    /// Fixed evaluation order.
    pub const ORDER: [Source; 4] = [Source::Org, Source::Workspace, Source::Agent, Source::RunOverride];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Org => "org",
            Source::Workspace => "workspace",
            Source::Agent => "agent",
            Source::RunOverride => "run_override",
        }
    }
}

/// The four-layer policy stack evaluated for every `ActionIntent`.
///
/// Precedence for the *effective decision* is by strictness: deny, then
/// escalate, then allow, among layers with an opinion. Precedence for
/// strictness ties, and for which profile an absent-layer reference points
/// at, is always run_override, then agent, then workspace, then org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyContext {
    pub org_policy: ProfileName,
    pub workspace_policy: ProfileName,
    pub agent_policy: ProfileName,
    pub run_override: Option<ProfileName>,
}

impl PolicyContext {
    /// The profile name bound to a given layer, if that layer is present.
    pub fn profile_for(&self, source: Source) -> Option<&ProfileName> {
        match source {
            Source::Org => Some(&self.org_policy),
            Source::Workspace => Some(&self.workspace_policy),
            Source::Agent => Some(&self.agent_policy),
            Source::RunOverride => self.run_override.as_ref(),
        }
    }

    /// Build a context identical to this one but with `run_override`
    /// replaced — used by the remediation planner's run-override search
    /// and by preview's "re-preview under each profile" counterfactual.
    pub fn with_run_override(&self, profile: Option<ProfileName>) -> Self {
        Self {
            org_policy: self.org_policy.clone(),
            workspace_policy: self.workspace_policy.clone(),
            agent_policy: self.agent_policy.clone(),
            run_override: profile,
        }
    }
}
