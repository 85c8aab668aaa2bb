//! Identity store core.
//!
//! Validates an [`OidcCredential`] against the session's [`IdentityContext`],
//! resolves the caller name and groups, and commits the new identity only
//! when every check has passed.

pub mod context;
pub mod credential;
pub mod resolve;
pub mod result;
pub mod validator;

pub use context::{IdentityContext, SessionState};
pub use credential::OidcCredential;
pub use resolve::ClaimSources;
pub use result::{ValidationResult, ValidationStatus};
pub use validator::CredentialValidator;
