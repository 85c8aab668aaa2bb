//! Claim-name configuration.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Reserved claim name that selects the authenticated subject directly.
pub const SUBJECT_CLAIM: &str = "sub";

/// Which claim supplies the caller name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallerNameClaim {
    /// Use the authenticated subject (`sub`) without consulting any claim source.
    Subject,
    /// Look the named claim up across the claim sources.
    Named(String),
}

impl CallerNameClaim {
    /// Claim name to look up, or `None` for the subject sentinel.
    pub fn claim_name(&self) -> Option<&str> {
        match self {
            CallerNameClaim::Subject => None,
            CallerNameClaim::Named(name) => Some(name),
        }
    }
}

impl From<String> for CallerNameClaim {
    fn from(name: String) -> Self {
        if name == SUBJECT_CLAIM {
            CallerNameClaim::Subject
        } else {
            CallerNameClaim::Named(name)
        }
    }
}

impl From<CallerNameClaim> for String {
    fn from(claim: CallerNameClaim) -> Self {
        match claim {
            CallerNameClaim::Subject => SUBJECT_CLAIM.to_string(),
            CallerNameClaim::Named(name) => name,
        }
    }
}

impl FromStr for CallerNameClaim {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl std::fmt::Display for CallerNameClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerNameClaim::Subject => write!(f, "{SUBJECT_CLAIM}"),
            CallerNameClaim::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Names of the claims carrying the caller name and caller groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimsConfig {
    /// Claim holding the caller name. Defaults to "preferred_username".
    #[serde(default = "default_caller_name_claim")]
    pub caller_name_claim: Option<CallerNameClaim>,

    /// Claim holding the caller groups. Defaults to "groups".
    #[serde(default = "default_caller_groups_claim")]
    pub caller_groups_claim: Option<String>,
}

fn default_caller_name_claim() -> Option<CallerNameClaim> {
    Some(CallerNameClaim::Named("preferred_username".to_string()))
}

fn default_caller_groups_claim() -> Option<String> {
    Some("groups".to_string())
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            caller_name_claim: default_caller_name_claim(),
            caller_groups_claim: default_caller_groups_claim(),
        }
    }
}

impl ClaimsConfig {
    pub fn new(caller_name_claim: &str, caller_groups_claim: &str) -> Self {
        Self {
            caller_name_claim: Some(CallerNameClaim::from(caller_name_claim.to_string())),
            caller_groups_claim: Some(caller_groups_claim.to_string()),
        }
    }

    /// Effective caller-name claim; unset and blank names are both `None`.
    pub fn name_claim(&self) -> Option<&CallerNameClaim> {
        self.caller_name_claim
            .as_ref()
            .filter(|claim| claim.claim_name().map_or(true, |name| !name.trim().is_empty()))
    }

    /// Effective caller-groups claim; unset and blank names are both `None`.
    pub fn groups_claim(&self) -> Option<&str> {
        self.caller_groups_claim
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}
