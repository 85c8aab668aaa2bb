//! Userinfo claim sources.

use anyhow::Result;

use crate::claims::ClaimSet;
use crate::token::AccessToken;

/// Supplies claims from the provider's userinfo endpoint.
///
/// Implementations own transport and retries. An empty set means the
/// provider returned no additional claims.
pub trait UserInfoClient: Send + Sync {
    fn fetch_user_info(&self, access_token: &AccessToken) -> Result<ClaimSet>;
}

/// Userinfo source for deployments that never query the endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUserInfo;

impl UserInfoClient for NoUserInfo {
    fn fetch_user_info(&self, _access_token: &AccessToken) -> Result<ClaimSet> {
        Ok(ClaimSet::new())
    }
}

/// Userinfo source returning a fixed claim set.
#[derive(Debug, Clone, Default)]
pub struct StaticUserInfo(ClaimSet);

impl StaticUserInfo {
    pub fn new(claims: ClaimSet) -> Self {
        Self(claims)
    }
}

impl UserInfoClient for StaticUserInfo {
    fn fetch_user_info(&self, _access_token: &AccessToken) -> Result<ClaimSet> {
        Ok(self.0.clone())
    }
}
