//! OIDC identity store.
//!
//! Validates the tokens an OpenID Connect provider returns to a relying
//! party, keeps the resulting identity per session, and resolves the caller
//! name and caller groups from the ID token, access token and userinfo claims.

pub mod claims;
pub mod error;
pub mod identity;
pub mod oidc;
pub mod session;
pub mod token;

pub use claims::{CallerNameClaim, ClaimSet, ClaimsConfig};
pub use error::TokenValidationError;
pub use identity::{
    CredentialValidator, IdentityContext, OidcCredential, SessionState, ValidationResult,
    ValidationStatus,
};
pub use oidc::{JwtTokenValidator, KeySet, OidcConfig, OidcConfigJson, TokenValidator};
pub use session::{SessionId, SessionStore};
pub use token::{AccessToken, IdentityToken};
