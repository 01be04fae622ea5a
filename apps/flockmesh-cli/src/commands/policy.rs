// policy.rs — evaluate/simulate/patch/rollback/export-history subcommands.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

use flockmesh_audit::{AuditAction, AuditEvent, AuditLog};
use flockmesh_policy::{
    classify, engine, ActionIntent, CapabilityId, Decision, PatchRuleInput, PolicyPatch,
    PolicyPatchService, PolicyRule, ProfileName, SideEffect, UserId,
};

use crate::config::Workspace;

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Evaluate a single capability against the workspace's policy context.
    Evaluate {
        capability: String,
        /// Target resource the synthetic action intent names.
        #[arg(long, default_value = "cli_target")]
        target: String,
    },
    /// Dry-run a set of rule changes against a profile without applying them.
    Simulate {
        profile: String,
        /// Repeatable `capability=decision:approvals` (e.g. `message.send=escalate:1`).
        #[arg(long = "rule")]
        rules: Vec<String>,
    },
    /// Apply a patch to a profile (requires admin authorization + a matching hash).
    Patch {
        profile: String,
        #[arg(long)]
        expected_hash: String,
        #[arg(long)]
        actor: String,
        #[arg(long, default_value = "")]
        reason: String,
        #[arg(long = "rule")]
        rules: Vec<String>,
    },
    /// Roll a profile back to the state before a prior patch.
    Rollback {
        profile: String,
        #[arg(long)]
        patch_id: Uuid,
        #[arg(long)]
        expected_hash: String,
        #[arg(long)]
        actor: String,
    },
    /// Sign and print the patch history for a profile (or all profiles).
    ExportHistory {
        /// Restrict to one profile; omit to export the full history.
        #[arg(long)]
        profile: Option<String>,
    },
}

fn parse_rule(raw: &str) -> Result<PatchRuleInput> {
    let (capability, spec) = raw
        .split_once('=')
        .with_context(|| format!("rule '{raw}' must be 'capability=decision:approvals'"))?;
    let (decision_str, approvals_str) = spec.split_once(':').unwrap_or((spec, "0"));

    let decision = match decision_str {
        "allow" => Decision::Allow,
        "escalate" => Decision::Escalate,
        "deny" => Decision::Deny,
        other => bail!("unknown decision '{other}' (expected allow, escalate, or deny)"),
    };
    let required_approvals: u8 = approvals_str
        .parse()
        .with_context(|| format!("invalid approval count in rule '{raw}'"))?;

    Ok(PatchRuleInput {
        capability: CapabilityId::new(capability)?,
        rule: Some(PolicyRule::new(decision, required_approvals)?),
    })
}

fn synthetic_intent(capability: &CapabilityId, target: &str, prefix: &str) -> ActionIntent {
    let classification = classify(capability);
    let sanitized = capability.as_str().replace('.', "_");
    ActionIntent {
        id: format!("act_{prefix}_{sanitized}"),
        run_id: format!("run_{prefix}"),
        step_id: format!("{prefix}.{capability}"),
        capability: capability.clone(),
        side_effect: classification.side_effect,
        risk_hint: classification.risk_hint,
        idempotency_key: matches!(classification.side_effect, SideEffect::Mutation)
            .then(|| format!("{prefix}-{target}")),
        parameters: serde_json::Value::Null,
        target: target.to_string(),
    }
}

pub fn execute(cmd: &PolicyCommands, workspace: &Workspace) -> Result<()> {
    let mut audit_log = AuditLog::open(workspace.audit_log_path())?;

    match cmd {
        PolicyCommands::Evaluate { capability, target } => {
            let capability = CapabilityId::new(capability)?;
            let intent = synthetic_intent(&capability, target, "cli_evaluate");
            let library = workspace.policy_library.snapshot();
            let decision = engine::evaluate("run_cli_evaluate", &intent, &workspace.context, &library);

            println!("{}", serde_json::to_string_pretty(&decision)?);

            audit_log.append(
                AuditEvent::new("cli", AuditAction::PolicyEvaluate, Utc::now())
                    .with_target(capability.as_str())
                    .with_metadata(serde_json::to_value(&decision)?),
            )?;
        }

        PolicyCommands::Simulate { profile, rules } => {
            let profile_name = ProfileName::new(profile.clone())?;
            let patch_rules: Vec<PatchRuleInput> =
                rules.iter().map(|r| parse_rule(r)).collect::<Result<_>>()?;

            let result = PolicyPatchService::simulate(
                &workspace.policy_library,
                &profile_name,
                &patch_rules,
                &workspace.context,
                None,
            )?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        PolicyCommands::Patch {
            profile,
            expected_hash,
            actor,
            reason,
            rules,
        } => {
            let profile_name = ProfileName::new(profile.clone())?;
            let actor_id = UserId::new(actor.clone())?;
            let patch_rules: Vec<PatchRuleInput> =
                rules.iter().map(|r| parse_rule(r)).collect::<Result<_>>()?;

            let mut history = {
                let mut log = flockmesh_policy::PatchHistoryLog::new();
                for entry in workspace.load_history()? {
                    log.append(entry);
                }
                log
            };

            let request = PolicyPatch {
                patch_id: Uuid::new_v4(),
                profile_name: profile_name.clone(),
                expected_profile_hash: expected_hash.clone(),
                rules: patch_rules,
                actor_id,
                reason: reason.clone(),
                created_at: Utc::now(),
            };

            let result = PolicyPatchService::patch(
                &workspace.policy_library,
                &workspace.admin_config,
                &mut history,
                &request,
                Utc::now(),
            )?;

            println!("{}", serde_json::to_string_pretty(&result)?);

            let updated_profile = workspace
                .policy_library
                .get(&profile_name)
                .context("patched profile vanished from the library")?;
            workspace.save_profile(&updated_profile)?;
            workspace.save_history(history.all())?;

            audit_log.append(
                AuditEvent::new(request.actor_id.as_str(), AuditAction::PolicyPatchApplied, Utc::now())
                    .with_target(profile.as_str())
                    .with_metadata(serde_json::to_value(&result)?),
            )?;
        }

        PolicyCommands::Rollback {
            profile,
            patch_id,
            expected_hash,
            actor,
        } => {
            let profile_name = ProfileName::new(profile.clone())?;
            let actor_id = UserId::new(actor.clone())?;

            let mut history = {
                let mut log = flockmesh_policy::PatchHistoryLog::new();
                for entry in workspace.load_history()? {
                    log.append(entry);
                }
                log
            };

            let result = PolicyPatchService::rollback(
                &workspace.policy_library,
                &workspace.admin_config,
                &mut history,
                &profile_name,
                *patch_id,
                expected_hash,
                &actor_id,
                Uuid::new_v4(),
                Utc::now(),
            )?;

            println!("{}", serde_json::to_string_pretty(&result)?);

            let restored_profile = workspace
                .policy_library
                .get(&profile_name)
                .context("rolled-back profile vanished from the library")?;
            workspace.save_profile(&restored_profile)?;
            workspace.save_history(history.all())?;

            audit_log.append(
                AuditEvent::new(actor_id.as_str(), AuditAction::PolicyPatchRolledBack, Utc::now())
                    .with_target(profile.as_str())
                    .with_metadata(serde_json::to_value(&result)?),
            )?;
        }

        PolicyCommands::ExportHistory { profile } => {
            let all_entries = workspace.load_history()?;
            let entries: Vec<_> = match profile {
                Some(name) => {
                    let profile_name = ProfileName::new(name.clone())?;
                    all_entries
                        .into_iter()
                        .filter(|e| e.profile_name == profile_name)
                        .collect()
                }
                None => all_entries,
            };

            let rng = ring::rand::SystemRandom::new();
            let pkcs8 = ring::signature::Ed25519KeyPair::generate_pkcs8(&rng)
                .map_err(|_| anyhow::anyhow!("failed to generate export signing key"))?;
            let signing_key = ring::signature::Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
                .map_err(|_| anyhow::anyhow!("failed to load export signing key"))?;

            let package = flockmesh_policy::export_history(&entries, &signing_key);
            println!("{}", serde_json::to_string_pretty(&package)?);
        }
    }

    Ok(())
}
