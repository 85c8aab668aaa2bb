//! Token validation errors.

use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// Failure of a cryptographic or protocol check on an ID or access token.
///
/// Always fatal to the current validation call: the credential is reported
/// as invalid and the session identity is left untouched.
#[derive(Debug, Error)]
pub enum TokenValidationError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Invalid issuer: {0}")]
    Issuer(String),

    #[error("Invalid audience: {0}")]
    Audience(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Nonce mismatch")]
    Nonce,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Signing algorithm not allowed: {0}")]
    AlgorithmNotAllowed(String),

    #[error("Access token not bound to ID token: {0}")]
    AlgorithmBinding(String),

    #[error("No verification key: {0}")]
    KeyNotFound(String),

    #[error("Refreshed ID token breaks continuity: {0}")]
    Continuity(String),

    #[error("Unsupported token: {0}")]
    Unsupported(String),
}

impl From<jsonwebtoken::errors::Error> for TokenValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::Signature(err.to_string()),
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::Issuer(err.to_string()),
            ErrorKind::InvalidAudience => Self::Audience(err.to_string()),
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::AlgorithmNotAllowed(err.to_string())
            }
            _ => Self::Malformed(err.to_string()),
        }
    }
}
