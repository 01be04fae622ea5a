// capability.rs — Capability Classifier.
//
// Pure function: capability name -> (side_effect, risk_hint). No I/O, no
// state. Order matters: read-only suffix test first, then high-risk
// tokens, then mutation tokens, else default to R1 mutation.

use serde::{Deserialize, Serialize};

use crate::ids::CapabilityId;

/// Whether evaluating an intent for this capability can mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    None,
    Mutation,
}

/// Coarse risk tier. R0 is read-only; R3 is the most sensitive mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskHint {
    R0,
    R1,
    R2,
    R3,
}

/// The result of classifying a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub side_effect: SideEffect,
    pub risk_hint: RiskHint,
}

/// Suffixes that mark a capability read-only, tested against the last
/// dot-separated segment.
const READ_ONLY_SUFFIXES: &[&str] = &["read", "list", "status", "search", "get"];

/// Tokens anywhere in the capability name that mark it high-risk (R3).
/// Checked in this order; first hit wins.
const HIGH_RISK_TOKENS: &[&str] = &[
    "payment", "finance", "legal", "contract", "credential", "admin", "delete", "terminate",
];

/// Tokens anywhere in the capability name that mark it a mutation (R2).
/// Checked in this order; first hit wins.
const MUTATION_TOKENS: &[&str] = &[
    "send", "write", "create", "update", "request", "invoke", "cancel", "execute", "publish",
];

/// Classify a capability
///
/// Order: read-only suffix test first; then high-risk tokens; then
/// mutation tokens; else R1 mutation.
pub fn classify(capability: &CapabilityId) -> Classification {
    let name = capability.as_str();
    let last_segment = name.rsplit('.').next().unwrap_or(name);

    if READ_ONLY_SUFFIXES.contains(&last_segment) {
        return Classification {
            side_effect: SideEffect::None,
            risk_hint: RiskHint::R0,
        };
    }

    if let Some(hint) = token_hit(name, HIGH_RISK_TOKENS) {
        let _ = hint;
        return Classification {
            side_effect: SideEffect::Mutation,
            risk_hint: RiskHint::R3,
        };
    }

    if let Some(hint) = token_hit(name, MUTATION_TOKENS) {
        let _ = hint;
        return Classification {
            side_effect: SideEffect::Mutation,
            risk_hint: RiskHint::R2,
        };
    }

    Classification {
        side_effect: SideEffect::Mutation,
        risk_hint: RiskHint::R1,
    }
}

/// Scan the dotted segments of `name` for the first token in `tokens` that
/// appears as one of them. Tie-break is lexical scan order of `tokens`,
/// not position within `name`.
fn token_hit<'a>(name: &str, tokens: &'a [&'a str]) -> Option<&'a str> {
    let segments: Vec<&str> = name.split('.').collect();
    tokens
        .iter()
        .find(|tok| segments.iter().any(|seg| seg == *tok))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(s: &str) -> CapabilityId {
        CapabilityId::new(s).unwrap()
    }

    #[test]
    fn read_only_suffixes_are_r0_none() {
        for suffix in READ_ONLY_SUFFIXES {
            let c = classify(&cap(&format!("message.{suffix}")));
            assert_eq!(c.side_effect, SideEffect::None);
            assert_eq!(c.risk_hint, RiskHint::R0);
        }
    }

    #[test]
    fn high_risk_tokens_are_r3_mutation() {
        let c = classify(&cap("payment.process"));
        assert_eq!(c.side_effect, SideEffect::Mutation);
        assert_eq!(c.risk_hint, RiskHint::R3);

        let c = classify(&cap("user.admin"));
        assert_eq!(c.risk_hint, RiskHint::R3);

        let c = classify(&cap("account.terminate"));
        assert_eq!(c.risk_hint, RiskHint::R3);
    }

    #[test]
    fn mutation_tokens_are_r2() {
        let c = classify(&cap("message.send"));
        assert_eq!(c.side_effect, SideEffect::Mutation);
        assert_eq!(c.risk_hint, RiskHint::R2);

        let c = classify(&cap("document.publish"));
        assert_eq!(c.risk_hint, RiskHint::R2);
    }

    #[test]
    fn unmatched_tokens_default_to_r1_mutation() {
        let c = classify(&cap("tool.configure"));
        assert_eq!(c.side_effect, SideEffect::Mutation);
        assert_eq!(c.risk_hint, RiskHint::R1);
    }

    #[test]
    fn high_risk_takes_priority_over_mutation() {
        // "credential.request" contains both a high-risk token and a
        // mutation token — high-risk must win (tested before mutation).
        let c = classify(&cap("credential.request"));
        assert_eq!(c.risk_hint, RiskHint::R3);
    }

    #[test]
    fn read_only_suffix_wins_even_with_mutation_token_elsewhere() {
        // "payment.status" ends in a read-only suffix, so it's R0/none even
        // though "payment" is a high-risk token — suffix test runs first.
        let c = classify(&cap("payment.status"));
        assert_eq!(c.side_effect, SideEffect::None);
        assert_eq!(c.risk_hint, RiskHint::R0);
    }
}
