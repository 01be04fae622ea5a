// engine.rs — Policy Engine.
//
// Pure function over an immutable library snapshot: no I/O, no locking, no
// mutation. Evaluation never throws — every failure mode (missing profile,
// mutation without idempotency key) surfaces through the returned
// `PolicyDecision`, never an `Err`. `policy.capability.invalid` can't occur
// here because `ActionIntent.capability` is a `CapabilityId`, which is only
// constructible from an already-valid pattern.

use crate::context::{PolicyContext, Source};
use crate::decision::{EffectiveSource, LayerDecision, PolicyDecision, PolicyTrace};
use crate::intent::ActionIntent;
use crate::library::PolicyLibrary;
use crate::rule::Decision;

/// Evaluate `intent` against the four-layer `context`, resolved against
/// `library`. `run_id` is carried only for tracing/correlation — the
/// intent's own `run_id` field is authoritative for evaluation semantics.
pub fn evaluate(
    run_id: &str,
    intent: &ActionIntent,
    context: &PolicyContext,
    library: &PolicyLibrary,
) -> PolicyDecision {
    tracing::debug!(run_id, capability = %intent.capability, "evaluating policy intent");

    let mut layer_decisions = Vec::new();
    let mut missing_profile = None;

    for source in Source::ORDER {
        let Some(profile_name) = context.profile_for(source) else {
            continue; // run_override absent: layer is skipped, not "missing".
        };
        let Some(profile) = library.get(profile_name) else {
            missing_profile = Some((source, profile_name.clone()));
            break;
        };

        let rule = profile.rules.get(&intent.capability).cloned();
        let (decision, required_approvals) = match &rule {
            Some(r) => (r.decision, r.required_approvals),
            None => (Decision::Allow, 0), // "no opinion at this layer"
        };
        layer_decisions.push(LayerDecision {
            source,
            profile: Some(profile_name.clone()),
            rule,
            decision,
            required_approvals,
        });
    }

    if let Some((source, profile_name)) = missing_profile {
        tracing::warn!(%profile_name, source = source.as_str(), "policy profile missing, failing closed");
        return PolicyDecision {
            decision: Decision::Deny,
            required_approvals: 0,
            reason_codes: vec!["policy.profile.missing".to_string()],
            policy_trace: PolicyTrace {
                layer_decisions,
                effective_source: EffectiveSource::Unknown,
                effective_profile: None,
            },
        };
    }

    // Only layers with an explicit rule contribute to strictness composition;
    // layers with no opinion don't count toward the effective decision.
    let contributing: Vec<&LayerDecision> =
        layer_decisions.iter().filter(|l| l.rule.is_some()).collect();

    let mut reason_codes = Vec::new();
    let decision;
    let required_approvals;
    let effective_source;
    let effective_profile;

    if contributing.is_empty() {
        decision = Decision::Allow;
        required_approvals = 0;
        effective_source = EffectiveSource::Unknown;
        effective_profile = None;
        reason_codes.push("policy.default.allow".to_string());
    } else {
        let max_severity = contributing.iter().map(|l| l.decision.severity()).max().unwrap();
        // Among layers tied on severity, the most specific wins
        // (run_override > agent > workspace > org) — `contributing` is in
        // `Source::ORDER`, so the last match is the most specific.
        let winner = contributing
            .iter()
            .rev()
            .find(|l| l.decision.severity() == max_severity)
            .unwrap();
        decision = winner.decision;
        effective_source = EffectiveSource::from(winner.source);
        effective_profile = winner.profile.clone();

        required_approvals = if decision == Decision::Escalate {
            contributing
                .iter()
                .filter(|l| l.decision == Decision::Escalate)
                .map(|l| l.required_approvals)
                .max()
                .unwrap_or(1)
                .clamp(1, 5)
        } else {
            0
        };

        for layer in &contributing {
            reason_codes.push(format!(
                "policy.{}.{:?}",
                layer.source.as_str(),
                layer.decision
            ).to_lowercase());
        }
    }

    if intent.is_mutation_without_idempotency() {
        reason_codes.push("policy.intent.mutation_without_idempotency".to_string());
    }

    tracing::info!(?decision, required_approvals, "policy decision");

    PolicyDecision {
        decision,
        required_approvals,
        reason_codes,
        policy_trace: PolicyTrace {
            layer_decisions,
            effective_source,
            effective_profile,
        },
    }
}
