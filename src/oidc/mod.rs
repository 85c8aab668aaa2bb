//! OIDC provider integration.
//!
//! Configuration, provider key sets, and the token and userinfo
//! collaborators the identity core delegates to.

pub mod config;
pub mod jwks;
pub mod userinfo;
pub mod validator;

pub use config::{OidcConfig, OidcConfigJson};
pub use jwks::KeySet;
pub use userinfo::{NoUserInfo, StaticUserInfo, UserInfoClient};
pub use validator::{
    access_token_hash, check_refresh_continuity, JwtTokenValidator, RequestContext, TokenValidator,
};
