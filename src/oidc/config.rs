//! OIDC relying-party configuration.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::claims::{CallerNameClaim, ClaimsConfig};

/// OIDC client configuration used to validate provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OidcConfig {
    /// Provider issuer identifier (iss claim). Must match exactly.
    /// Example: "https://auth.example.com"
    #[serde(default)]
    pub issuer: String,

    /// Client identifier registered with the provider (expected aud claim).
    #[serde(default)]
    pub client_id: String,

    /// Client secret. Required when an HS* signing algorithm is allowed.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Accepted ID token signing algorithms. Defaults to RS256.
    #[serde(default = "default_signing_algorithms")]
    pub signing_algorithms: Vec<String>,

    /// Clock skew tolerance in seconds for exp/nbf validation.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,

    /// Bind fresh ID tokens to the nonce of the authentication request.
    #[serde(default = "default_use_nonce")]
    pub use_nonce: bool,

    /// Caller name and groups claim names.
    #[serde(default)]
    pub claims: ClaimsConfig,
}

fn default_signing_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

fn default_clock_skew() -> u64 {
    30
}

fn default_use_nonce() -> bool {
    true
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            client_secret: None,
            signing_algorithms: default_signing_algorithms(),
            clock_skew_secs: default_clock_skew(),
            use_nonce: default_use_nonce(),
            claims: ClaimsConfig::default(),
        }
    }
}

impl OidcConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("OIDC issuer is required".to_string());
        }

        if !self.issuer.starts_with("https://") && !self.issuer.starts_with("http://") {
            return Err("OIDC issuer must be a valid HTTP(S) URL".to_string());
        }

        if self.client_id.is_empty() {
            return Err("OIDC client_id is required".to_string());
        }

        if self.signing_algorithms.is_empty() {
            return Err("At least one signing algorithm is required".to_string());
        }

        for name in &self.signing_algorithms {
            let alg = Algorithm::from_str(name)
                .map_err(|_| format!("Unsupported signing algorithm: {name}"))?;
            if is_hmac(alg) && self.client_secret.as_deref().map_or(true, str::is_empty) {
                return Err(format!("{name} requires a client_secret"));
            }
        }

        Ok(())
    }

    /// Allowed algorithms that `jsonwebtoken` understands.
    pub fn allowed_algorithms(&self) -> Vec<Algorithm> {
        self.signing_algorithms
            .iter()
            .filter_map(|name| Algorithm::from_str(name).ok())
            .collect()
    }
}

pub(crate) fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// JSON configuration overlay, as loaded from a config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OidcConfigJson {
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub signing_algorithms: Vec<String>,
    pub clock_skew_secs: Option<u64>,
    pub use_nonce: Option<bool>,
    pub caller_name_claim: Option<String>,
    pub caller_groups_claim: Option<String>,
}

impl OidcConfigJson {
    /// Apply JSON config to existing config.
    pub fn apply_to(&self, config: &mut OidcConfig) {
        if let Some(ref issuer) = self.issuer {
            config.issuer = issuer.clone();
        }
        if let Some(ref client_id) = self.client_id {
            config.client_id = client_id.clone();
        }
        if let Some(ref secret) = self.client_secret {
            config.client_secret = Some(secret.clone());
        }
        if !self.signing_algorithms.is_empty() {
            config.signing_algorithms = self.signing_algorithms.clone();
        }
        if let Some(skew) = self.clock_skew_secs {
            config.clock_skew_secs = skew;
        }
        if let Some(use_nonce) = self.use_nonce {
            config.use_nonce = use_nonce;
        }
        if let Some(ref claim) = self.caller_name_claim {
            config.claims.caller_name_claim = Some(CallerNameClaim::from(claim.clone()));
        }
        if let Some(ref claim) = self.caller_groups_claim {
            config.claims.caller_groups_claim = Some(claim.clone());
        }
    }
}
