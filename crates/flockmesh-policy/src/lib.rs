//! Capability classifier, policy library, evaluation engine, patch service,
//! and admin guard for FlockMesh.

pub mod admin;
pub mod canonical;
pub mod capability;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod export;
pub mod ids;
pub mod intent;
pub mod library;
pub mod patch;
pub mod profile;
pub mod rule;

pub use admin::{can_actor_manage, AdminDecision, AdminScope, PolicyAdminConfig};
pub use capability::{classify, Classification, RiskHint, SideEffect};
pub use context::{PolicyContext, Source};
pub use decision::{EffectiveSource, LayerDecision, PolicyDecision, PolicyTrace};
pub use error::PolicyError;
pub use export::{export_history, verify_export, PolicyPatchHistoryExportPackage};
pub use ids::{CapabilityId, IdError, ProfileName, UserId, WorkspaceId};
pub use intent::ActionIntent;
pub use library::{PolicyLibrary, PolicyLibraryHandle};
pub use patch::{
    PatchHistoryLog, PatchRuleInput, PolicyPatch, PolicyPatchHistoryEntry,
    PolicyPatchService, PolicyProfilePatchResult, PolicySimulationResult, SimulationItem,
};
pub use profile::PolicyProfile;
pub use rule::{Decision, PolicyRule};
