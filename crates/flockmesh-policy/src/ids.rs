// ids.rs — validating-constructor newtypes for the spec's string-pattern IDs.
//
// Every place the spec names a pattern-constrained identifier (capability,
// profile name, actor/user id) gets a newtype here instead of a bare
// `String`. The constructor is the single point where the pattern is
// enforced — once you hold one of these, it's valid by construction.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("capability '{0}' does not match ^[a-z][a-z0-9_]*(\\.[a-z][a-z0-9_]*)+$")]
    InvalidCapability(String),
    #[error("profile name '{0}' does not match ^[a-z][a-z0-9_]{{2,80}}$")]
    InvalidProfileName(String),
    #[error("user id '{0}' does not match ^(usr|svc)_[A-Za-z0-9_-]{{4,64}}$")]
    InvalidUserId(String),
    #[error("workspace id '{0}' does not match ^wsp_[A-Za-z0-9_-]{{1,64}}$")]
    InvalidWorkspaceId(String),
}

fn capability_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").unwrap())
}

fn profile_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]{2,80}$").unwrap())
}

fn user_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(usr|svc)_[A-Za-z0-9_-]{4,64}$").unwrap())
}

fn workspace_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^wsp_[A-Za-z0-9_-]{1,64}$").unwrap())
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

pattern_id!(CapabilityId, capability_re, InvalidCapability);
pattern_id!(ProfileName, profile_name_re, InvalidProfileName);
pattern_id!(UserId, user_id_re, InvalidUserId);
pattern_id!(WorkspaceId, workspace_id_re, InvalidWorkspaceId);
