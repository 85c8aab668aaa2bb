//! Session-scoped identity state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::claims::ClaimSet;
use crate::token::{AccessToken, IdentityToken};

/// Authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Current tokens and resolved identity of one session.
///
/// Only a successful credential validation (which replaces every field in
/// one step) or [`IdentityContext::invalidate`] change it, so the caller name
/// and groups always belong to the tokens stored next to them. Callers
/// sharing a context across threads serialize access themselves; the
/// session store keeps each context behind a mutex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityContext {
    identity_token: Option<IdentityToken>,
    access_token: Option<AccessToken>,
    caller_name: Option<String>,
    caller_groups: BTreeSet<String>,
    user_info: ClaimSet,
    subject: Option<String>,
}

/// Everything a successful validation commits, computed up front.
#[derive(Debug)]
pub(crate) struct AuthenticatedIdentity {
    pub identity_token: IdentityToken,
    pub access_token: Option<AccessToken>,
    pub user_info: ClaimSet,
    pub subject: String,
    pub caller_name: String,
    pub caller_groups: BTreeSet<String>,
}

impl IdentityContext {
    /// An unauthenticated context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.identity_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn identity_token(&self) -> Option<&IdentityToken> {
        self.identity_token.as_ref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn caller_name(&self) -> Option<&str> {
        self.caller_name.as_deref()
    }

    pub fn caller_groups(&self) -> &BTreeSet<String> {
        &self.caller_groups
    }

    /// Claims returned by the userinfo endpoint; empty when none were fetched.
    pub fn user_info(&self) -> &ClaimSet {
        &self.user_info
    }

    /// Authenticated subject (`sub`).
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Replace the whole identity with a validated one.
    pub(crate) fn commit(&mut self, identity: AuthenticatedIdentity) {
        *self = Self {
            identity_token: Some(identity.identity_token),
            access_token: identity.access_token,
            caller_name: Some(identity.caller_name),
            caller_groups: identity.caller_groups,
            user_info: identity.user_info,
            subject: Some(identity.subject),
        };
    }

    /// Drop all tokens and identity (logout or expiry).
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}
