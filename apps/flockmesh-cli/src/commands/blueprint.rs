// blueprint.rs — preview/lint/remediate subcommands.

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use flockmesh_audit::{AuditAction, AuditEvent, AuditLog};
use flockmesh_blueprint::{lint, plan, ConnectorId, KitId};
use flockmesh_policy::UserId;

use crate::config::Workspace;

#[derive(Subcommand)]
pub enum BlueprintCommands {
    /// Build an agent blueprint preview.
    Preview(BlueprintArgs),
    /// Build a preview and lint it.
    Lint(BlueprintArgs),
    /// Build a preview, lint it, and compute a remediation plan.
    Remediate(BlueprintArgs),
}

#[derive(clap::Args)]
pub struct BlueprintArgs {
    workspace_id: String,
    kit_id: String,
    /// Repeatable owner user id; defaults to none.
    #[arg(long = "owner")]
    owners: Vec<String>,
    #[arg(long)]
    agent_name: Option<String>,
    /// Repeatable connector id to select; defaults to the kit's full candidate list.
    #[arg(long = "connector")]
    connectors: Vec<String>,
}

pub fn execute(cmd: &BlueprintCommands, workspace: &Workspace) -> Result<()> {
    let clock = flockmesh_blueprint::SystemClock;

    let (args, mode) = match cmd {
        BlueprintCommands::Preview(args) => (args, "preview"),
        BlueprintCommands::Lint(args) => (args, "lint"),
        BlueprintCommands::Remediate(args) => (args, "remediate"),
    };

    let workspace_id = flockmesh_policy::WorkspaceId::new(args.workspace_id.clone())?;
    let kit_id = KitId::new(args.kit_id.clone())?;
    let owners: Vec<UserId> = args
        .owners
        .iter()
        .map(|o| UserId::new(o.clone()))
        .collect::<Result<_, _>>()?;
    let selected: Option<Vec<ConnectorId>> = if args.connectors.is_empty() {
        None
    } else {
        Some(
            args.connectors
                .iter()
                .map(|c| ConnectorId::new(c.clone()))
                .collect::<Result<_, _>>()?,
        )
    };

    let mut audit_log = AuditLog::open(workspace.audit_log_path())?;

    let policy_library = workspace.policy_library.snapshot();
    let preview = flockmesh_blueprint::build(
        &workspace_id,
        &kit_id,
        &owners,
        args.agent_name.as_deref(),
        selected.as_deref(),
        &workspace.manifests,
        &workspace.context,
        &policy_library,
        &workspace.kit_library,
        &clock,
    )?;

    audit_log.append(
        AuditEvent::new("cli", AuditAction::BlueprintPreviewBuilt, Utc::now())
            .with_target(args.workspace_id.as_str())
            .with_metadata(serde_json::to_value(&preview)?),
    )?;

    if mode == "preview" {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let lint_report = lint(&preview);
    if mode == "lint" {
        println!("{}", serde_json::to_string_pretty(&lint_report)?);
        return Ok(());
    }

    let selected_ids: Vec<ConnectorId> = preview
        .connector_plan
        .iter()
        .map(|item| item.connector_id.clone())
        .collect();

    let remediation = plan(
        &workspace_id,
        &kit_id,
        &owners,
        args.agent_name.as_deref(),
        &selected_ids,
        &workspace.manifests,
        &workspace.context,
        &policy_library,
        &workspace.kit_library,
        &preview,
        &lint_report,
        &clock,
    )?;

    audit_log.append(
        AuditEvent::new("cli", AuditAction::RemediationPlanComputed, Utc::now())
            .with_target(args.workspace_id.as_str())
            .with_metadata(serde_json::to_value(&remediation)?),
    )?;

    println!("{}", serde_json::to_string_pretty(&remediation)?);

    Ok(())
}
