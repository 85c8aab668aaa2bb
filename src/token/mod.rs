//! Tokens returned by the OIDC provider.

pub mod access;
pub mod identity;

pub use access::AccessToken;
pub use identity::IdentityToken;
