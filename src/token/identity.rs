//! OIDC ID tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::claims::ClaimSet;
use crate::error::TokenValidationError;

/// Protected JOSE header of a compact JWS or JWE.
#[derive(Debug, Deserialize)]
struct JoseHeader {
    alg: String,
    #[serde(default)]
    enc: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

/// An ID token as received from the provider.
///
/// Signed tokens expose their (not yet verified) payload claims right away.
/// Encrypted tokens carry no usable claims until a validator has decrypted
/// them and the result has been attached with [`IdentityToken::attach_claims`].
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityToken {
    raw: String,
    algorithm: String,
    key_id: Option<String>,
    encrypted: bool,
    claims: Option<ClaimSet>,
}

impl IdentityToken {
    /// Parse a compact serialized token.
    ///
    /// Three segments are a signed JWT, five segments an encrypted JWE.
    pub fn parse(raw: &str) -> Result<Self, TokenValidationError> {
        let raw = raw.trim();
        let segments: Vec<&str> = raw.split('.').collect();

        let (header, encrypted, claims) = match segments.as_slice() {
            [header, payload, _signature] => {
                (decode_header(header)?, false, Some(ClaimSet::from_jwt_segment(payload)?))
            }
            [header, _key, _iv, _ciphertext, _tag] => (decode_header(header)?, true, None),
            _ => {
                return Err(TokenValidationError::Malformed(format!(
                    "expected 3 or 5 segments, found {}",
                    segments.len()
                )))
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            encrypted: encrypted || header.enc.is_some(),
            algorithm: header.alg,
            key_id: header.kid,
            claims,
        })
    }

    /// Compact serialized form.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// JOSE `alg` header value.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// JOSE `kid` header value.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Claims, or `None` for an encrypted token that has not been validated yet.
    pub fn claims(&self) -> Option<&ClaimSet> {
        self.claims.as_ref()
    }

    /// Attach the validated (decrypted) claim map.
    pub fn attach_claims(&mut self, claims: ClaimSet) {
        self.claims = Some(claims);
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|c| c.get_str("sub"))
    }
}

fn decode_header(segment: &str) -> Result<JoseHeader, TokenValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenValidationError::Malformed(format!("invalid header encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenValidationError::Malformed(format!("invalid JOSE header: {e}")))
}
