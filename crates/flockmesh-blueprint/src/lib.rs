//! Agent Blueprint Planner: kit library, preview builder, lint reporter,
//! and remediation planner.

pub mod clock;
pub mod error;
pub mod ids;
pub mod kit;
pub mod lint;
pub mod manifest;
pub mod preview;
pub mod remediation;

pub use clock::{Clock, FixedClock, RepeatingClock, SystemClock};
pub use error::BlueprintError;
pub use ids::{ConnectorId, IdError as BlueprintIdError, KitId, PhaseId, PlaybookId};
pub use kit::{AgentKit, ApprovalExpectation, ConnectorCandidate, KitLibrary, RiskProfile, RolloutPhase};
pub use lint::{lint, AgentBlueprintLintReport, GateResult, LintGates, LintStatus};
pub use manifest::{ConnectorManifest, TrustLevel};
pub use preview::{
    build, AgentBlueprintPreview, AgentDraft, ApprovalForecast, BlueprintWarning,
    CapabilityCoverage, ConnectorPlanItem, ConnectorStatus, PlannerMetrics, PolicyProjection,
    PolicyProjectionItem, PolicyProjectionSummary, WarningSeverity,
};
pub use remediation::{
    plan, Applicability, ApprovalCapacityCandidate, AutoFixRequest, ConnectorAddition,
    ConnectorRemoval, EstimatedEffect, PatchRuleDraft, PolicyCandidate, PolicyCandidateKind,
    RunOverrideCandidate,
};
