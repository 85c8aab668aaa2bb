//! Credentials collected by the hosting framework.

use crate::error::TokenValidationError;
use crate::oidc::RequestContext;
use crate::token::{AccessToken, IdentityToken};

/// Tokens returned by the provider for one request, plus request state.
#[derive(Debug, Clone)]
pub struct OidcCredential {
    pub id_token: IdentityToken,
    pub access_token: Option<AccessToken>,
    pub request: RequestContext,
}

impl OidcCredential {
    pub fn new(id_token: IdentityToken) -> Self {
        Self {
            id_token,
            access_token: None,
            request: RequestContext::default(),
        }
    }

    /// Build a credential from a compact serialized ID token.
    pub fn parse(raw_id_token: &str) -> Result<Self, TokenValidationError> {
        Ok(Self::new(IdentityToken::parse(raw_id_token)?))
    }

    pub fn with_access_token(mut self, access_token: AccessToken) -> Self {
        self.access_token = Some(access_token);
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }
}
