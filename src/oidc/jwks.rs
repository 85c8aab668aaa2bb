//! Static JSON Web Key Sets.

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Key ID used for keys that do not carry a `kid`.
const DEFAULT_KID: &str = "default";

/// Provider verification keys indexed by key ID.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

/// JWKS document.
#[derive(Debug, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JSON Web Key.
#[derive(Debug, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC)
    pub kty: String,
    /// Key ID
    pub kid: Option<String>,
    /// Algorithm
    pub alg: Option<String>,
    /// Key use (sig, enc)
    #[serde(rename = "use")]
    pub key_use: Option<String>,

    // RSA parameters
    /// RSA modulus (base64url)
    pub n: Option<String>,
    /// RSA exponent (base64url)
    pub e: Option<String>,

    // EC parameters
    /// EC curve
    pub crv: Option<String>,
    /// EC x coordinate (base64url)
    pub x: Option<String>,
    /// EC y coordinate (base64url)
    pub y: Option<String>,
}

impl KeySet {
    /// An empty key set, for HMAC-only configurations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JWKS document. Encryption keys and unusable keys are skipped.
    pub fn from_jwks_json(json: &str) -> Result<Self> {
        let jwks: Jwks = serde_json::from_str(json).context("Failed to parse JWKS")?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if jwk.key_use.as_deref() == Some("enc") {
                continue;
            }

            match Self::jwk_to_decoding_key(&jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| DEFAULT_KID.to_string());
                    debug!(kid = %kid, kty = %jwk.kty, alg = ?jwk.alg, "Loaded JWK");
                    keys.insert(kid, key);
                }
                Err(e) => {
                    warn!(
                        kid = ?jwk.kid,
                        kty = %jwk.kty,
                        error = %e,
                        "Failed to parse JWK, skipping"
                    );
                }
            }
        }

        if keys.is_empty() {
            return Err(anyhow!("No valid signing keys found in JWKS"));
        }

        info!(key_count = keys.len(), "JWKS loaded");
        Ok(Self { keys })
    }

    /// Load a JWKS document from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JWKS file: {:?}", path))?;
        Self::from_jwks_json(&json)
    }

    /// Key for the given `kid`, or the only/default key when no `kid` is given.
    pub fn key(&self, kid: Option<&str>) -> Option<&DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid),
            None if self.keys.len() == 1 => self.keys.values().next(),
            None => self.keys.get(DEFAULT_KID),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Convert a JWK to a DecodingKey.
    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey> {
        match jwk.kty.as_str() {
            "RSA" => {
                let n = jwk.n.as_ref().ok_or_else(|| anyhow!("RSA key missing 'n'"))?;
                let e = jwk.e.as_ref().ok_or_else(|| anyhow!("RSA key missing 'e'"))?;

                DecodingKey::from_rsa_components(n, e).context("Failed to create RSA DecodingKey")
            }
            "EC" => {
                let x = jwk.x.as_ref().ok_or_else(|| anyhow!("EC key missing 'x'"))?;
                let y = jwk.y.as_ref().ok_or_else(|| anyhow!("EC key missing 'y'"))?;
                let crv = jwk
                    .crv
                    .as_ref()
                    .ok_or_else(|| anyhow!("EC key missing 'crv'"))?;

                match crv.as_str() {
                    "P-256" | "P-384" => DecodingKey::from_ec_components(x, y)
                        .context("Failed to create EC DecodingKey"),
                    _ => Err(anyhow!("Unsupported EC curve: {}", crv)),
                }
            }
            kty => Err(anyhow!("Unsupported key type: {}", kty)),
        }
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
