//! ID token and access token validation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::str::FromStr;
use tracing::debug;

use super::config::{is_hmac, OidcConfig};
use super::jwks::KeySet;
use crate::claims::ClaimSet;
use crate::error::TokenValidationError;
use crate::token::{AccessToken, IdentityToken};

/// Per-request state from the authentication exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    nonce: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce sent with the authentication request.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }
}

/// Cryptographic and protocol checks on provider tokens.
///
/// Each method either returns the validated claims or fails; none of them
/// touch session state.
pub trait TokenValidator: Send + Sync {
    /// Validate an ID token from a fresh authentication.
    fn validate_id_token(
        &self,
        id_token: &IdentityToken,
        request: &RequestContext,
        config: &OidcConfig,
    ) -> Result<ClaimSet, TokenValidationError>;

    /// Validate an ID token returned by a token refresh against the token it replaces.
    fn validate_refreshed_id_token(
        &self,
        previous: &IdentityToken,
        id_token: &IdentityToken,
        request: &RequestContext,
        config: &OidcConfig,
    ) -> Result<ClaimSet, TokenValidationError>;

    /// Validate an access token against the ID token it was issued with.
    fn validate_access_token(
        &self,
        access_token: &AccessToken,
        id_token_algorithm: &str,
        id_token_claims: &ClaimSet,
        config: &OidcConfig,
    ) -> Result<(), TokenValidationError>;
}

/// [`TokenValidator`] verifying signed JWTs with `jsonwebtoken`.
///
/// HS* tokens are verified with the client secret, all others with the
/// provider key set. Encrypted ID tokens are rejected.
#[derive(Debug, Default)]
pub struct JwtTokenValidator {
    keys: KeySet,
}

impl JwtTokenValidator {
    pub fn new(keys: KeySet) -> Self {
        Self { keys }
    }

    /// Verify signature and standard claims of an ID token.
    fn verify(
        &self,
        id_token: &IdentityToken,
        config: &OidcConfig,
    ) -> Result<ClaimSet, TokenValidationError> {
        if id_token.is_encrypted() {
            return Err(TokenValidationError::Unsupported(
                "encrypted ID tokens require a decrypting validator".to_string(),
            ));
        }

        let alg = Algorithm::from_str(id_token.algorithm()).map_err(|_| {
            TokenValidationError::AlgorithmNotAllowed(id_token.algorithm().to_string())
        })?;
        if !config.allowed_algorithms().contains(&alg) {
            return Err(TokenValidationError::AlgorithmNotAllowed(
                id_token.algorithm().to_string(),
            ));
        }

        let key = self.decoding_key(alg, id_token.key_id(), config)?;

        let mut validation = Validation::new(alg);
        validation.leeway = config.clock_skew_secs;
        validation.validate_nbf = true;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<ClaimSet>(id_token.raw(), &key, &validation)?.claims;

        if claims.get_i64("iat").is_none() {
            return Err(TokenValidationError::MissingClaim("iat".to_string()));
        }

        if claims.audience().len() > 1 && claims.get_str("azp") != Some(config.client_id.as_str())
        {
            return Err(TokenValidationError::Audience(
                "azp must name the client when several audiences are present".to_string(),
            ));
        }

        debug!(
            alg = ?alg,
            kid = ?id_token.key_id(),
            sub = ?claims.get_str("sub"),
            "ID token signature and claims verified"
        );

        Ok(claims)
    }

    fn decoding_key(
        &self,
        alg: Algorithm,
        kid: Option<&str>,
        config: &OidcConfig,
    ) -> Result<DecodingKey, TokenValidationError> {
        if is_hmac(alg) {
            let secret = config
                .client_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    TokenValidationError::KeyNotFound("client secret not configured".to_string())
                })?;
            return Ok(DecodingKey::from_secret(secret.as_bytes()));
        }

        self.keys
            .key(kid)
            .cloned()
            .ok_or_else(|| TokenValidationError::KeyNotFound(format!("no JWK for kid {:?}", kid)))
    }
}

impl TokenValidator for JwtTokenValidator {
    fn validate_id_token(
        &self,
        id_token: &IdentityToken,
        request: &RequestContext,
        config: &OidcConfig,
    ) -> Result<ClaimSet, TokenValidationError> {
        let claims = self.verify(id_token, config)?;

        if config.use_nonce {
            if let Some(expected) = request.nonce() {
                if claims.get_str("nonce") != Some(expected) {
                    return Err(TokenValidationError::Nonce);
                }
            }
        }

        Ok(claims)
    }

    fn validate_refreshed_id_token(
        &self,
        previous: &IdentityToken,
        id_token: &IdentityToken,
        _request: &RequestContext,
        config: &OidcConfig,
    ) -> Result<ClaimSet, TokenValidationError> {
        let claims = self.verify(id_token, config)?;
        let prior = previous.claims().ok_or_else(|| {
            TokenValidationError::Continuity("previous ID token carries no claims".to_string())
        })?;
        check_refresh_continuity(prior, &claims)?;
        Ok(claims)
    }

    fn validate_access_token(
        &self,
        access_token: &AccessToken,
        id_token_algorithm: &str,
        id_token_claims: &ClaimSet,
        _config: &OidcConfig,
    ) -> Result<(), TokenValidationError> {
        let Some(expected) = id_token_claims.get_str("at_hash") else {
            debug!("ID token has no at_hash, access token accepted");
            return Ok(());
        };

        let actual = access_token_hash(access_token.raw(), id_token_algorithm)?;
        if actual != expected {
            return Err(TokenValidationError::AlgorithmBinding(
                "at_hash does not match the access token".to_string(),
            ));
        }

        Ok(())
    }
}

/// Check that a refreshed ID token continues the session of the one it replaces.
///
/// Issuer, subject, audience and authorized party must be unchanged,
/// `auth_time` may not move backwards or disappear, and a nonce, if present, must repeat
/// the original one.
pub fn check_refresh_continuity(
    prior: &ClaimSet,
    current: &ClaimSet,
) -> Result<(), TokenValidationError> {
    if prior.get_str("iss") != current.get_str("iss") {
        return Err(TokenValidationError::Continuity("issuer changed".to_string()));
    }

    if prior.get_str("sub") != current.get_str("sub") {
        return Err(TokenValidationError::Continuity("subject changed".to_string()));
    }

    if prior.audience() != current.audience() {
        return Err(TokenValidationError::Continuity("audience changed".to_string()));
    }

    if let (Some(before), Some(after)) = (prior.get_str("azp"), current.get_str("azp")) {
        if before != after {
            return Err(TokenValidationError::Continuity(
                "authorized party changed".to_string(),
            ));
        }
    }

    if let Some(before) = prior.get_i64("auth_time") {
        let after = current.get_i64("auth_time").ok_or_else(|| {
            TokenValidationError::Continuity("auth_time missing".to_string())
        })?;
        if after < before {
            return Err(TokenValidationError::Continuity(
                "auth_time moved backwards".to_string(),
            ));
        }
    }

    if let Some(nonce) = current.get_str("nonce") {
        if prior.get_str("nonce") != Some(nonce) {
            return Err(TokenValidationError::Continuity("nonce changed".to_string()));
        }
    }

    Ok(())
}

/// `at_hash` value for an access token: base64url of the left half of its
/// SHA-2 digest, with the digest size taken from the ID token algorithm.
pub fn access_token_hash(access_token: &str, algorithm: &str) -> Result<String, TokenValidationError> {
    let digest: Vec<u8> = if algorithm.ends_with("256") {
        Sha256::digest(access_token.as_bytes()).to_vec()
    } else if algorithm.ends_with("384") {
        Sha384::digest(access_token.as_bytes()).to_vec()
    } else if algorithm.ends_with("512") || algorithm == "EdDSA" {
        Sha512::digest(access_token.as_bytes()).to_vec()
    } else {
        return Err(TokenValidationError::AlgorithmBinding(format!(
            "no at_hash digest defined for {algorithm}"
        )));
    };

    Ok(URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2]))
}
