// manifest.rs — ConnectorManifest, an external input.
//
// Manifests describe what a connector, once wired up, actually grants —
// supplied by the connector adapter I/O layer, which this workspace doesn't
// implement. The planner only ever reads them.

use serde::{Deserialize, Serialize};

use flockmesh_policy::{CapabilityId, WorkspaceId};

use crate::ids::ConnectorId;

/// How much the platform trusts a connector's own isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Standard,
    Sandbox,
    HighControl,
    Unknown,
}

/// A connector's declared capability grant, scoped to one workspace.
///
/// Manifests are workspace-scoped resources under the general
/// workspace-isolation invariant, so the preview builder can reject a
/// selected manifest whose `workspace_id` doesn't match the blueprint's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorManifest {
    pub connector_id: ConnectorId,
    pub workspace_id: WorkspaceId,
    pub category: String,
    pub trust_level: TrustLevel,
    pub capabilities: Vec<CapabilityId>,
}
