// error.rs — error taxonomy for the blueprint subsystem.

use thiserror::Error;

use flockmesh_policy::IdError;

/// Errors surfaced by kit loading, preview building, and remediation
/// planning. Warnings (manifest_missing, no_scope_match, ...) are not
/// errors — they're collected into the preview payload ("Blueprint
/// warnings"); these variants are for synchronous failures that stop the
/// operation outright.
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    #[error("kit '{0}' not found in kit library")]
    KitNotFound(String),

    #[error("failed to read kit directory '{path}': {source}")]
    KitDirReadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse kit file '{path}': {source}")]
    KitParseFailed {
        path: String,
        source: serde_json::Error,
    },

    #[error(
        "connector '{connector_id}' manifest belongs to workspace '{manifest_workspace}', not '{requested_workspace}'"
    )]
    CrossWorkspaceConnector {
        connector_id: String,
        manifest_workspace: String,
        requested_workspace: String,
    },
}
