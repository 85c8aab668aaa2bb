//! Outcome of a credential validation.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// Caller identity handed to the hosting framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    caller_name: Option<String>,
    caller_groups: BTreeSet<String>,
    status: ValidationStatus,
}

impl ValidationResult {
    pub fn valid(caller_name: String, caller_groups: BTreeSet<String>) -> Self {
        Self {
            caller_name: Some(caller_name),
            caller_groups,
            status: ValidationStatus::Valid,
        }
    }

    pub fn invalid() -> Self {
        Self {
            caller_name: None,
            caller_groups: BTreeSet::new(),
            status: ValidationStatus::Invalid,
        }
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    /// Caller name; `None` only for invalid results.
    pub fn caller_name(&self) -> Option<&str> {
        self.caller_name.as_deref()
    }

    pub fn caller_groups(&self) -> &BTreeSet<String> {
        &self.caller_groups
    }
}
