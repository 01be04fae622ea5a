// rule.rs — PolicyRule and its decision enum.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// The three decisions a policy rule (or the engine's effective decision)
/// can produce, ordered by severity for strictness composition:
/// `Deny > Escalate > Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Escalate,
    Deny,
}

impl Decision {
    /// Severity for strictness composition: higher wins.
    pub(crate) fn severity(self) -> u8 {
        match self {
            Decision::Allow => 0,
            Decision::Escalate => 1,
            Decision::Deny => 2,
        }
    }
}

/// A single capability rule within a [`crate::profile::PolicyProfile`].
///
/// Invariant: `decision == Escalate` iff `required_approvals >= 1`;
/// otherwise `required_approvals == 0`. Enforced by construction: the
/// `Deserialize` impl routes through `PolicyRule::new`, so this invariant
/// holds for every `PolicyRule` that exists, not just ones built by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyRuleShadow")]
pub struct PolicyRule {
    pub decision: Decision,
    pub required_approvals: u8,
}

/// Unchecked wire shape `PolicyRule`'s `Deserialize` routes through, so
/// every deserialized rule passes through `PolicyRule::new`.
#[derive(Deserialize)]
struct PolicyRuleShadow {
    decision: Decision,
    required_approvals: u8,
}

impl TryFrom<PolicyRuleShadow> for PolicyRule {
    type Error = PolicyError;

    fn try_from(shadow: PolicyRuleShadow) -> Result<Self, Self::Error> {
        PolicyRule::new(shadow.decision, shadow.required_approvals)
    }
}

impl PolicyRule {
    /// Construct a rule, enforcing the escalate/approvals invariant and the
    /// `[0,5]` bound on `required_approvals`.
    pub fn new(decision: Decision, required_approvals: u8) -> Result<Self, PolicyError> {
        if required_approvals > 5 {
            return Err(PolicyError::InvalidRule {
                capability: String::new(),
                reason: format!("required_approvals {required_approvals} exceeds max of 5"),
            });
        }
        match decision {
            Decision::Escalate if required_approvals < 1 => Err(PolicyError::InvalidRule {
                capability: String::new(),
                reason: "decision=escalate requires required_approvals >= 1".to_string(),
            }),
            Decision::Escalate => Ok(Self {
                decision,
                required_approvals,
            }),
            _ if required_approvals != 0 => Err(PolicyError::InvalidRule {
                capability: String::new(),
                reason: format!(
                    "decision={decision:?} requires required_approvals == 0, got {required_approvals}"
                ),
            }),
            _ => Ok(Self {
                decision,
                required_approvals: 0,
            }),
        }
    }

    pub fn severity(&self) -> u8 {
        self.decision.severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_deny_gt_escalate_gt_allow() {
        assert!(Decision::Deny.severity() > Decision::Escalate.severity());
        assert!(Decision::Escalate.severity() > Decision::Allow.severity());
    }

    #[test]
    fn escalate_requires_at_least_one_approval() {
        assert!(PolicyRule::new(Decision::Escalate, 0).is_err());
        assert!(PolicyRule::new(Decision::Escalate, 1).is_ok());
    }

    #[test]
    fn allow_and_deny_require_zero_approvals() {
        assert!(PolicyRule::new(Decision::Allow, 1).is_err());
        assert!(PolicyRule::new(Decision::Deny, 2).is_err());
        assert!(PolicyRule::new(Decision::Allow, 0).is_ok());
        assert!(PolicyRule::new(Decision::Deny, 0).is_ok());
    }

    #[test]
    fn required_approvals_capped_at_five() {
        assert!(PolicyRule::new(Decision::Escalate, 6).is_err());
        assert!(PolicyRule::new(Decision::Escalate, 5).is_ok());
    }

    #[test]
    fn deserialize_rejects_invariant_violating_rule() {
        let json = r#"{"decision":"escalate","required_approvals":0}"#;
        assert!(serde_json::from_str::<PolicyRule>(json).is_err());
    }

    #[test]
    fn deserialize_accepts_valid_rule() {
        let json = r#"{"decision":"allow","required_approvals":0}"#;
        let rule: PolicyRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.decision, Decision::Allow);
    }
}
