// admin.rs — Policy Admin Guard.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ids::{ProfileName, UserId};

/// Which scope an authorized actor was granted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminScope {
    Global,
    Profile,
}

/// Result of an admin-authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDecision {
    pub allowed: bool,
    pub scope: Option<AdminScope>,
    pub reason_code: Option<String>,
}

/// The merged set of global and per-profile admins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyAdminConfig {
    pub global_admins: HashSet<UserId>,
    pub profile_admins: HashMap<ProfileName, HashSet<UserId>>,
}

impl PolicyAdminConfig {
    /// Merge another config's admins into this one by set-union (: admin
    /// config files from multiple sources are merged this way).
    pub fn merge(&mut self, other: PolicyAdminConfig) {
        self.global_admins.extend(other.global_admins);
        for (profile, admins) in other.profile_admins {
            self.profile_admins.entry(profile).or_default().extend(admins);
        }
    }
}

/// Determine whether `actor_id` may manage `profile_name`.
///
/// Global admins may manage any profile. Otherwise the actor must appear in
/// `profile_admins[profile_name]`. Actor/profile pattern validity is
/// guaranteed by the `UserId`/`ProfileName` newtypes, so no separate
/// pattern-validation step is needed here.
pub fn can_actor_manage(
    config: &PolicyAdminConfig,
    actor_id: &UserId,
    profile_name: &ProfileName,
) -> AdminDecision {
    if config.global_admins.contains(actor_id) {
        return AdminDecision {
            allowed: true,
            scope: Some(AdminScope::Global),
            reason_code: None,
        };
    }

    if config
        .profile_admins
        .get(profile_name)
        .is_some_and(|admins| admins.contains(actor_id))
    {
        return AdminDecision {
            allowed: true,
            scope: Some(AdminScope::Profile),
            reason_code: None,
        };
    }

    AdminDecision {
        allowed: false,
        scope: None,
        reason_code: Some("policy.admin.not_authorized".to_string()),
    }
}
