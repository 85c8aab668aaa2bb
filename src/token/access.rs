//! OAuth 2.0 access tokens.

use tracing::debug;

use crate::claims::ClaimSet;

/// An access token, opaque or JWT-formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    raw: String,
    claims: Option<ClaimSet>,
}

impl AccessToken {
    /// Wrap a raw token. JWT-formatted tokens get their payload decoded.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let claims = jwt_payload(&raw);
        Self { raw, claims }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_jwt(&self) -> bool {
        self.claims.is_some()
    }

    /// Payload claims; `None` for opaque tokens.
    pub fn claims(&self) -> Option<&ClaimSet> {
        self.claims.as_ref()
    }
}

fn jwt_payload(raw: &str) -> Option<ClaimSet> {
    let mut segments = raw.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return None;
    };

    match ClaimSet::from_jwt_segment(payload) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "Access token is not a JWT, treating as opaque");
            None
        }
    }
}
