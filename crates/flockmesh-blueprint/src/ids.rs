// ids.rs — validating-constructor newtypes for the blueprint subsystem's
// pattern-constrained identifiers.
//
// `WorkspaceId` and the policy-side IDs already live in `flockmesh-policy`;
// this module only adds the ones specific to kits, connectors, and
// playbooks/rollout phases.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("kit id '{0}' does not match ^kit_[A-Za-z0-9_-]{{4,64}}$")]
    InvalidKitId(String),
    #[error("connector id '{0}' does not match ^con_[A-Za-z0-9_-]{{4,64}}$")]
    InvalidConnectorId(String),
    #[error("playbook id '{0}' does not match ^pbk_[A-Za-z0-9_-]{{4,64}}$")]
    InvalidPlaybookId(String),
    #[error("phase id '{0}' does not match ^phase_[A-Za-z0-9_-]{{2,64}}$")]
    InvalidPhaseId(String),
}

fn kit_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^kit_[A-Za-z0-9_-]{4,64}$").unwrap())
}

fn connector_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^con_[A-Za-z0-9_-]{4,64}$").unwrap())
}

fn playbook_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^pbk_[A-Za-z0-9_-]{4,64}$").unwrap())
}

fn phase_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^phase_[A-Za-z0-9_-]{2,64}$").unwrap())
}

macro_rules! pattern_id {
    ($name:ident, $validator:ident, $err:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                if $validator().is_match(&raw) {
                    Ok(Self(raw))
                } else {
                    Err(IdError::$err(raw))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;
            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

pattern_id!(KitId, kit_id_re, InvalidKitId);
pattern_id!(ConnectorId, connector_id_re, InvalidConnectorId);
pattern_id!(PlaybookId, playbook_id_re, InvalidPlaybookId);
pattern_id!(PhaseId, phase_id_re, InvalidPhaseId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kit_id_prefix_enforced() {
        assert!(KitId::new("kit_office_ops_core").is_ok());
        assert!(KitId::new("office_ops_core").is_err());
    }

    #[test]
    fn connector_id_prefix_enforced() {
        assert!(ConnectorId::new("con_feishu_official").is_ok());
        assert!(ConnectorId::new("feishu_official").is_err());
    }

    #[test]
    fn playbook_and_phase_ids() {
        assert!(PlaybookId::new("pbk_office_ops").is_ok());
        assert!(PhaseId::new("phase_pilot").is_ok());
        assert!(PhaseId::new("ph").is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let id = ConnectorId::new("con_feishu_official").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"con_feishu_official\"");
        let restored: ConnectorId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }
}
