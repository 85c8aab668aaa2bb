//! Caller name and caller groups resolution.
//!
//! Both lookups walk the claim sources in a fixed precedence order and stop
//! at the first source that has the claim. Groups are never merged across
//! sources.

use std::collections::BTreeSet;
use tracing::debug;

use crate::claims::{CallerNameClaim, ClaimSet};

/// The claim sources of one validation.
#[derive(Debug, Clone, Copy)]
pub struct ClaimSources<'a> {
    /// Validated ID token claims.
    pub id_token: &'a ClaimSet,
    /// Access token claims; `None` for opaque access tokens or no access token.
    pub access_token: Option<&'a ClaimSet>,
    /// Userinfo endpoint claims.
    pub user_info: &'a ClaimSet,
}

impl ClaimSources<'_> {
    /// Caller name: ID token, then access token, then userinfo, then the subject.
    ///
    /// The subject sentinel skips the lookup entirely.
    pub fn caller_name(&self, claim: Option<&CallerNameClaim>, subject: &str) -> String {
        let name = match claim {
            Some(CallerNameClaim::Subject) | None => None,
            Some(CallerNameClaim::Named(name)) => self.lookup_name(name),
        };
        name.unwrap_or_else(|| subject.to_string())
    }

    fn lookup_name(&self, claim: &str) -> Option<String> {
        if let Some(name) = self.id_token.get_str(claim) {
            debug!(claim, source = "id_token", "Caller name resolved");
            return Some(name.to_string());
        }
        if let Some(name) = self.access_token.and_then(|c| c.get_str(claim)) {
            debug!(claim, source = "access_token", "Caller name resolved");
            return Some(name.to_string());
        }
        if let Some(name) = self.user_info.get_str(claim) {
            debug!(claim, source = "userinfo", "Caller name resolved");
            return Some(name.to_string());
        }
        debug!(claim, "Caller name claim not found, using subject");
        None
    }

    /// Caller groups from the first source where the claim is present.
    ///
    /// A present but empty array still wins over lower-precedence sources.
    pub fn caller_groups(&self, claim: Option<&str>) -> BTreeSet<String> {
        let Some(claim) = claim else {
            return BTreeSet::new();
        };

        if let Some(groups) = self.access_token.and_then(|c| c.string_array(claim)) {
            debug!(claim, source = "access_token", count = groups.len(), "Caller groups resolved");
            return groups;
        }
        if let Some(groups) = self.id_token.stringified_list(claim) {
            debug!(claim, source = "id_token", count = groups.len(), "Caller groups resolved");
            return groups;
        }
        if let Some(groups) = self.user_info.string_elements(claim) {
            debug!(claim, source = "userinfo", count = groups.len(), "Caller groups resolved");
            return groups;
        }

        debug!(claim, "Caller groups claim not found");
        BTreeSet::new()
    }
}
