//! Credential validation: token checks, identity resolution and commit.

use tracing::{debug, info, warn};

use super::context::{AuthenticatedIdentity, IdentityContext};
use super::credential::OidcCredential;
use super::resolve::ClaimSources;
use super::result::ValidationResult;
use crate::claims::ClaimSet;
use crate::error::TokenValidationError;
use crate::oidc::{NoUserInfo, OidcConfig, TokenValidator, UserInfoClient};
use crate::token::AccessToken;

/// Validates OIDC credentials and records the resulting identity in a session context.
pub struct CredentialValidator<V, U = NoUserInfo> {
    token_validator: V,
    user_info: U,
}

impl<V: TokenValidator> CredentialValidator<V> {
    pub fn new(token_validator: V) -> Self {
        Self {
            token_validator,
            user_info: NoUserInfo,
        }
    }
}

impl<V: TokenValidator, U: UserInfoClient> CredentialValidator<V, U> {
    /// Use `user_info` as the userinfo claim source.
    pub fn with_user_info<W: UserInfoClient>(self, user_info: W) -> CredentialValidator<V, W> {
        CredentialValidator {
            token_validator: self.token_validator,
            user_info,
        }
    }

    /// Validate `credential` and, on success, commit the identity to `context`.
    ///
    /// Any token validation failure yields an invalid result and leaves
    /// `context` exactly as it was.
    pub fn validate(
        &self,
        credential: OidcCredential,
        config: &OidcConfig,
        context: &mut IdentityContext,
    ) -> ValidationResult {
        match self.try_validate(credential, config, context) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, state = %context.state(), "OIDC credential rejected");
                ValidationResult::invalid()
            }
        }
    }

    /// Like [`CredentialValidator::validate`], but reports why validation failed.
    pub fn try_validate(
        &self,
        credential: OidcCredential,
        config: &OidcConfig,
        context: &mut IdentityContext,
    ) -> Result<ValidationResult, TokenValidationError> {
        let OidcCredential {
            mut id_token,
            access_token,
            request,
        } = credential;

        let refresh = context.identity_token().is_some();
        let validated = match context.identity_token() {
            None => {
                debug!("No ID token in session, validating fresh authentication");
                self.token_validator
                    .validate_id_token(&id_token, &request, config)?
            }
            Some(previous) => {
                debug!("Session has an ID token, validating refreshed ID token");
                self.token_validator
                    .validate_refreshed_id_token(previous, &id_token, &request, config)?
            }
        };

        if id_token.is_encrypted() {
            id_token.attach_claims(validated);
        }

        let id_claims = id_token.claims().ok_or_else(|| {
            TokenValidationError::Malformed("ID token carries no claims".to_string())
        })?;
        let subject = id_token
            .subject()
            .ok_or_else(|| TokenValidationError::MissingClaim("sub".to_string()))?
            .to_string();

        // A refresh without a new access token keeps the current one and the
        // userinfo claims fetched with it, provided the new ID token still
        // binds to it.
        let (access_token, user_info) = match access_token {
            Some(access_token) => {
                self.token_validator.validate_access_token(
                    &access_token,
                    id_token.algorithm(),
                    id_claims,
                    config,
                )?;
                debug!(jwt = access_token.is_jwt(), "Access token validated");
                let user_info = self.fetch_user_info(&access_token, &subject);
                (Some(access_token), user_info)
            }
            None => {
                let retained = context.access_token().cloned();
                if let Some(retained) = &retained {
                    self.token_validator.validate_access_token(
                        retained,
                        id_token.algorithm(),
                        id_claims,
                        config,
                    )?;
                    debug!(jwt = retained.is_jwt(), "Retained access token still bound");
                }
                (retained, context.user_info().clone())
            }
        };

        let sources = ClaimSources {
            id_token: id_claims,
            access_token: access_token.as_ref().and_then(AccessToken::claims),
            user_info: &user_info,
        };
        let caller_name = sources.caller_name(config.claims.name_claim(), &subject);
        let caller_groups = sources.caller_groups(config.claims.groups_claim());

        info!(
            sub = %subject,
            caller = %caller_name,
            groups = caller_groups.len(),
            refresh,
            "OIDC credential validated"
        );

        let result = ValidationResult::valid(caller_name.clone(), caller_groups.clone());
        context.commit(AuthenticatedIdentity {
            identity_token: id_token,
            access_token,
            user_info,
            subject,
            caller_name,
            caller_groups,
        });

        Ok(result)
    }

    /// Userinfo claims for `subject`; failures and foreign claims degrade to none.
    fn fetch_user_info(&self, access_token: &AccessToken, subject: &str) -> ClaimSet {
        match self.user_info.fetch_user_info(access_token) {
            Ok(claims) => match claims.get_str("sub") {
                Some(sub) if sub != subject => {
                    warn!(
                        expected = %subject,
                        found = %sub,
                        "Userinfo subject does not match ID token, ignoring userinfo claims"
                    );
                    ClaimSet::new()
                }
                _ => claims,
            },
            Err(e) => {
                warn!(error = %e, "Failed to fetch userinfo claims");
                ClaimSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{CallerNameClaim, ClaimsConfig};
    use crate::identity::context::SessionState;
    use crate::identity::result::ValidationStatus;
    use crate::oidc::validator::tests::{id_claims, id_token, test_config};
    use crate::oidc::{
        access_token_hash, check_refresh_continuity, JwtTokenValidator, KeySet, RequestContext,
        StaticUserInfo,
    };
    use crate::token::identity::tests::compact;
    use crate::token::IdentityToken;
    use anyhow::anyhow;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Validator that trusts token payloads and records which checks ran.
    #[derive(Default)]
    struct RecordingValidator {
        calls: Mutex<Vec<&'static str>>,
        reject_access_token: bool,
        decrypted_claims: Option<ClaimSet>,
    }

    impl RecordingValidator {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn claims_of(&self, token: &IdentityToken) -> Result<ClaimSet, TokenValidationError> {
            token
                .claims()
                .cloned()
                .or_else(|| self.decrypted_claims.clone())
                .ok_or_else(|| TokenValidationError::Unsupported("no claims".to_string()))
        }
    }

    impl TokenValidator for RecordingValidator {
        fn validate_id_token(
            &self,
            id_token: &IdentityToken,
            _request: &RequestContext,
            _config: &OidcConfig,
        ) -> Result<ClaimSet, TokenValidationError> {
            self.record("fresh");
            self.claims_of(id_token)
        }

        fn validate_refreshed_id_token(
            &self,
            previous: &IdentityToken,
            id_token: &IdentityToken,
            _request: &RequestContext,
            _config: &OidcConfig,
        ) -> Result<ClaimSet, TokenValidationError> {
            self.record("refresh");
            let claims = self.claims_of(id_token)?;
            check_refresh_continuity(previous.claims().unwrap(), &claims)?;
            Ok(claims)
        }

        fn validate_access_token(
            &self,
            _access_token: &AccessToken,
            _id_token_algorithm: &str,
            _id_token_claims: &ClaimSet,
            _config: &OidcConfig,
        ) -> Result<(), TokenValidationError> {
            self.record("access_token");
            if self.reject_access_token {
                return Err(TokenValidationError::AlgorithmBinding("rejected".to_string()));
            }
            Ok(())
        }
    }

    struct FailingUserInfo;

    impl UserInfoClient for FailingUserInfo {
        fn fetch_user_info(&self, _access_token: &AccessToken) -> anyhow::Result<ClaimSet> {
            Err(anyhow!("userinfo endpoint unavailable"))
        }
    }

    fn unsigned(claims: serde_json::Value) -> OidcCredential {
        OidcCredential::parse(&compact(json!({"alg": "RS256"}), claims)).unwrap()
    }

    fn access_token(claims: serde_json::Value) -> AccessToken {
        AccessToken::new(compact(json!({"alg": "RS256"}), claims))
    }

    fn groups(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fresh_login_commits_identity() {
        let validator = CredentialValidator::new(RecordingValidator::default());
        let mut context = IdentityContext::new();
        let credential = unsigned(json!({
            "sub": "user-1",
            "preferred_username": "alice",
            "groups": ["dev"]
        }))
        .with_access_token(AccessToken::new("opaque-token"));

        let result = validator.validate(credential, &test_config(), &mut context);

        assert_eq!(result.status(), ValidationStatus::Valid);
        assert_eq!(result.caller_name(), Some("alice"));
        assert_eq!(result.caller_groups(), &groups(&["dev"]));
        assert_eq!(validator.token_validator.calls(), vec!["fresh", "access_token"]);

        assert_eq!(context.state(), SessionState::Authenticated);
        assert_eq!(context.subject(), Some("user-1"));
        assert_eq!(context.caller_name(), Some("alice"));
        assert_eq!(context.caller_groups(), &groups(&["dev"]));
        assert_eq!(context.access_token().map(AccessToken::raw), Some("opaque-token"));
    }

    #[test]
    fn test_existing_id_token_routes_through_refresh() {
        let validator = CredentialValidator::new(RecordingValidator::default());
        let config = test_config();
        let mut context = IdentityContext::new();

        let first = validator.validate(unsigned(json!({"sub": "user-1"})), &config, &mut context);
        assert!(first.is_valid());

        let refreshed = validator.validate(unsigned(json!({"sub": "user-1"})), &config, &mut context);
        assert!(refreshed.is_valid());
        assert_eq!(validator.token_validator.calls(), vec!["fresh", "refresh"]);

        // subject continuity is enforced on the refresh path only
        let before = context.clone();
        let hijack = validator.validate(unsigned(json!({"sub": "user-2"})), &config, &mut context);
        assert_eq!(hijack.status(), ValidationStatus::Invalid);
        assert_eq!(validator.token_validator.calls(), vec!["fresh", "refresh", "refresh"]);
        assert_eq!(context, before);
    }

    #[test]
    fn test_refresh_rejects_subject_change_with_jwt_validator() {
        let validator = CredentialValidator::new(JwtTokenValidator::new(KeySet::empty()));
        let config = test_config();
        let mut context = IdentityContext::new();

        let login = OidcCredential::new(id_token(id_claims("user-1", json!({}))));
        assert!(validator.validate(login, &config, &mut context).is_valid());
        let before = context.clone();

        let other = OidcCredential::new(id_token(id_claims("user-2", json!({}))));
        let err = validator
            .try_validate(other, &config, &mut context)
            .unwrap_err();
        assert!(matches!(err, TokenValidationError::Continuity(_)));
        assert_eq!(context, before);

        // the same subject refreshes cleanly and replaces the token
        let same = OidcCredential::new(id_token(id_claims("user-1", json!({"auth_time": 1}))));
        assert!(validator.validate(same, &config, &mut context).is_valid());
        assert_ne!(context.identity_token(), before.identity_token());
    }

    #[test]
    fn test_fresh_failure_leaves_context_unauthenticated() {
        let validator = CredentialValidator::new(JwtTokenValidator::new(KeySet::empty()));
        let mut context = IdentityContext::new();
        let expired = OidcCredential::new(id_token(id_claims(
            "user-1",
            json!({"exp": chrono::Utc::now().timestamp() - 3600}),
        )));

        let result = validator.validate(expired, &test_config(), &mut context);

        assert_eq!(result, ValidationResult::invalid());
        assert_eq!(context, IdentityContext::new());
    }

    #[test]
    fn test_access_token_failure_commits_nothing() {
        let config = test_config();
        let mut context = IdentityContext::new();

        let login = unsigned(json!({"sub": "user-1", "preferred_username": "alice"}));
        let accepting = CredentialValidator::new(RecordingValidator::default());
        assert!(accepting.validate(login, &config, &mut context).is_valid());
        let before = context.clone();

        let validator = CredentialValidator::new(RecordingValidator {
            reject_access_token: true,
            ..Default::default()
        });

        let refresh = unsigned(json!({"sub": "user-1", "preferred_username": "alice2"}))
            .with_access_token(access_token(json!({"groups": ["x"]})));
        let result = validator.validate(refresh, &config, &mut context);

        assert_eq!(result.status(), ValidationStatus::Invalid);
        // neither the ID token nor the access token were replaced
        assert_eq!(context, before);
        assert_eq!(context.caller_name(), Some("alice"));
    }

    #[test]
    fn test_at_hash_mismatch_with_jwt_validator_is_atomic() {
        let validator = CredentialValidator::new(JwtTokenValidator::new(KeySet::empty()));
        let config = test_config();
        let mut context = IdentityContext::new();

        let at_hash = access_token_hash("good-token", "HS256").unwrap();
        let login = OidcCredential::new(id_token(id_claims("user-1", json!({"at_hash": at_hash}))))
            .with_access_token(AccessToken::new("good-token"));
        assert!(validator.validate(login, &config, &mut context).is_valid());
        let before = context.clone();

        let at_hash = access_token_hash("expected-token", "HS256").unwrap();
        let refresh = OidcCredential::new(id_token(id_claims(
            "user-1",
            json!({"at_hash": at_hash, "preferred_username": "changed"}),
        )))
        .with_access_token(AccessToken::new("substituted-token"));
        let err = validator
            .try_validate(refresh, &config, &mut context)
            .unwrap_err();

        assert!(matches!(err, TokenValidationError::AlgorithmBinding(_)));
        assert_eq!(context, before);
    }

    #[test]
    fn test_encrypted_token_gets_validated_claims() {
        let decrypted = ClaimSet::new()
            .with("sub", "user-9")
            .with("preferred_username", "carol");
        let validator = CredentialValidator::new(RecordingValidator {
            decrypted_claims: Some(decrypted.clone()),
            ..Default::default()
        });
        let mut context = IdentityContext::new();

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RSA-OAEP","enc":"A256GCM"}"#);
        let credential = OidcCredential::parse(&format!("{header}.a2V5.aXY.Y2lwaGVy.dGFn")).unwrap();
        assert!(credential.id_token.claims().is_none());

        let result = validator.validate(credential, &test_config(), &mut context);

        assert_eq!(result.caller_name(), Some("carol"));
        let stored = context.identity_token().unwrap();
        assert!(stored.is_encrypted());
        assert_eq!(stored.claims(), Some(&decrypted));
    }

    #[test]
    fn test_missing_subject_is_invalid() {
        let validator = CredentialValidator::new(RecordingValidator::default());
        let mut context = IdentityContext::new();

        let err = validator
            .try_validate(unsigned(json!({"name": "x"})), &test_config(), &mut context)
            .unwrap_err();
        assert!(matches!(err, TokenValidationError::MissingClaim(ref c) if c == "sub"));
        assert!(!context.is_authenticated());
    }

    #[test]
    fn test_groups_precedence_across_sources() {
        let validator = CredentialValidator::new(RecordingValidator::default())
            .with_user_info(StaticUserInfo::new(
                ClaimSet::new().with("sub", "user-1").with("groups", json!(["c"])),
            ));
        let mut context = IdentityContext::new();

        let credential = unsigned(json!({"sub": "user-1", "groups": ["b"]}))
            .with_access_token(access_token(json!({"groups": ["a"]})));
        let result = validator.validate(credential, &test_config(), &mut context);
        assert_eq!(result.caller_groups(), &groups(&["a"]));

        // empty access-token groups still short-circuit the ID token groups
        let mut context = IdentityContext::new();
        let credential = unsigned(json!({"sub": "user-1", "groups": ["b"]}))
            .with_access_token(access_token(json!({"groups": []})));
        let result = validator.validate(credential, &test_config(), &mut context);
        assert!(result.is_valid());
        assert!(result.caller_groups().is_empty());
    }

    #[test]
    fn test_userinfo_groups_and_name() {
        let mut config = test_config();
        config.claims = ClaimsConfig::new("email", "groups");
        let validator = CredentialValidator::new(RecordingValidator::default()).with_user_info(
            StaticUserInfo::new(
                ClaimSet::new()
                    .with("sub", "user-1")
                    .with("email", "user@example.com")
                    .with("groups", json!(["admin", 1, "user"])),
            ),
        );
        let mut context = IdentityContext::new();

        let credential =
            unsigned(json!({"sub": "user-1"})).with_access_token(AccessToken::new("opaque"));
        let result = validator.validate(credential, &config, &mut context);

        assert_eq!(result.caller_name(), Some("user@example.com"));
        assert_eq!(result.caller_groups(), &groups(&["admin", "user"]));
        assert_eq!(context.user_info().get_str("email"), Some("user@example.com"));
    }

    #[test]
    fn test_userinfo_for_other_subject_is_ignored() {
        let mut config = test_config();
        config.claims.caller_name_claim = Some(CallerNameClaim::Named("email".to_string()));
        let validator = CredentialValidator::new(RecordingValidator::default()).with_user_info(
            StaticUserInfo::new(
                ClaimSet::new()
                    .with("sub", "someone-else")
                    .with("email", "other@example.com"),
            ),
        );
        let mut context = IdentityContext::new();

        let credential =
            unsigned(json!({"sub": "user-1"})).with_access_token(AccessToken::new("opaque"));
        let result = validator.validate(credential, &config, &mut context);

        assert_eq!(result.caller_name(), Some("user-1"));
        assert!(context.user_info().is_empty());
    }

    #[test]
    fn test_userinfo_failure_degrades_to_empty() {
        let validator =
            CredentialValidator::new(RecordingValidator::default()).with_user_info(FailingUserInfo);
        let mut context = IdentityContext::new();

        let credential =
            unsigned(json!({"sub": "user-1"})).with_access_token(AccessToken::new("opaque"));
        let result = validator.validate(credential, &test_config(), &mut context);

        assert!(result.is_valid());
        assert_eq!(result.caller_name(), Some("user-1"));
        assert!(context.user_info().is_empty());
    }

    #[test]
    fn test_refresh_without_access_token_keeps_current_one() {
        let validator = CredentialValidator::new(RecordingValidator::default());
        let config = test_config();
        let mut context = IdentityContext::new();

        let login = unsigned(json!({"sub": "user-1"}))
            .with_access_token(access_token(json!({"groups": ["ops"]})));
        assert!(validator.validate(login, &config, &mut context).is_valid());

        let refresh = unsigned(json!({"sub": "user-1", "groups": ["dev"]}));
        let result = validator.validate(refresh, &config, &mut context);

        assert_eq!(result.caller_groups(), &groups(&["ops"]));
        assert!(context.access_token().is_some());
        assert_eq!(context.caller_groups(), &groups(&["ops"]));
    }

    #[test]
    fn test_refresh_rechecks_retained_access_token() {
        let validator = CredentialValidator::new(JwtTokenValidator::new(KeySet::empty()));
        let config = test_config();
        let mut context = IdentityContext::new();

        let at_hash = access_token_hash("first-token", "HS256").unwrap();
        let login = OidcCredential::new(id_token(id_claims("user-1", json!({"at_hash": at_hash}))))
            .with_access_token(AccessToken::new("first-token"));
        assert!(validator.validate(login, &config, &mut context).is_valid());
        let before = context.clone();

        // issued alongside a different access token than the one in the session
        let at_hash = access_token_hash("second-token", "HS256").unwrap();
        let refresh =
            OidcCredential::new(id_token(id_claims("user-1", json!({"at_hash": at_hash}))));
        let err = validator
            .try_validate(refresh, &config, &mut context)
            .unwrap_err();
        assert!(matches!(err, TokenValidationError::AlgorithmBinding(_)));
        assert_eq!(context, before);

        // without at_hash the retained token is kept
        let refresh = OidcCredential::new(id_token(id_claims("user-1", json!({}))));
        assert!(validator.validate(refresh, &config, &mut context).is_valid());
        assert_eq!(context.access_token().map(AccessToken::raw), Some("first-token"));
    }

    #[test]
    fn test_invalidate_returns_to_fresh_path() {
        let validator = CredentialValidator::new(RecordingValidator::default());
        let config = test_config();
        let mut context = IdentityContext::new();

        assert!(validator
            .validate(unsigned(json!({"sub": "user-1"})), &config, &mut context)
            .is_valid());
        context.invalidate();
        assert!(validator
            .validate(unsigned(json!({"sub": "user-2"})), &config, &mut context)
            .is_valid());

        assert_eq!(validator.token_validator.calls(), vec!["fresh", "fresh"]);
        assert_eq!(context.subject(), Some("user-2"));
    }
}
