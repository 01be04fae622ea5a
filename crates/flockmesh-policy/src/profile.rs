// profile.rs — PolicyProfile: a named set of capability -> rule overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::hash_canonical;
use crate::ids::{CapabilityId, ProfileName};
use crate::rule::PolicyRule;

/// A named, positive list of capability rule overrides. Profiles are
/// "positive lists": absence of a capability means "no opinion at
/// this layer", not "deny".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyProfile {
    pub name: ProfileName,
    /// `BTreeMap` keeps capability keys sorted, which is what the spec's
    /// "sorted keys" canonical-hash requirement needs without extra work.
    pub rules: BTreeMap<CapabilityId, PolicyRule>,
    pub hash: String,
}

impl PolicyProfile {
    /// Build a profile from its rules, computing the stable hash over the
    /// canonical serialization.
    pub fn new(name: ProfileName, rules: BTreeMap<CapabilityId, PolicyRule>) -> Self {
        let hash = hash_canonical(&rules);
        Self { name, rules, hash }
    }

    /// Recompute `hash` from the current `rules` — callers must do this
    /// after any in-place mutation.
    pub fn rehash(&mut self) {
        self.hash = hash_canonical(&self.rules);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Decision;

    fn rule(d: Decision, n: u8) -> PolicyRule {
        PolicyRule::new(d, n).unwrap()
    }

    #[test]
    fn hash_is_stable_regardless_of_insertion_order() {
        let name = ProfileName::new("org_default").unwrap();
        let cap_a = CapabilityId::new("message.send").unwrap();
        let cap_b = CapabilityId::new("calendar.read").unwrap();

        let mut rules1 = BTreeMap::new();
        rules1.insert(cap_a.clone(), rule(Decision::Escalate, 1));
        rules1.insert(cap_b.clone(), rule(Decision::Allow, 0));

        let mut rules2 = BTreeMap::new();
        rules2.insert(cap_b, rule(Decision::Allow, 0));
        rules2.insert(cap_a, rule(Decision::Escalate, 1));

        let p1 = PolicyProfile::new(name.clone(), rules1);
        let p2 = PolicyProfile::new(name, rules2);
        assert_eq!(p1.hash, p2.hash);
    }

    #[test]
    fn hash_changes_when_rules_change() {
        let name = ProfileName::new("org_default").unwrap();
        let cap = CapabilityId::new("message.send").unwrap();

        let mut rules = BTreeMap::new();
        rules.insert(cap.clone(), rule(Decision::Allow, 0));
        let p1 = PolicyProfile::new(name.clone(), rules.clone());

        rules.insert(cap, rule(Decision::Deny, 0));
        let p2 = PolicyProfile::new(name, rules);

        assert_ne!(p1.hash, p2.hash);
    }
}
