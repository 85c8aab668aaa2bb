//! OIDC Identity Store
//!
//! Validates credential files (ID token, optional access token, nonce and
//! userinfo claims) against an OIDC client configuration and prints the
//! resolved caller identity. Several credentials are validated in order
//! within one session, so later ones take the token refresh path.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use oidc_identity_store::oidc::{RequestContext, StaticUserInfo};
use oidc_identity_store::session::{
    spawn_cleanup_task, SessionId, DEFAULT_CLEANUP_INTERVAL_SECS,
};
use oidc_identity_store::{
    AccessToken, ClaimSet, CredentialValidator, JwtTokenValidator, KeySet, OidcConfig,
    OidcConfigJson, OidcCredential, SessionStore, ValidationResult,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "oidc-identity-store")]
#[command(about = "Validate OIDC provider tokens and resolve the caller identity")]
struct Args {
    /// OIDC client configuration file (JSON)
    #[arg(long, env = "OIDC_CONFIG")]
    config: PathBuf,

    /// Provider JWKS file (JSON), needed for RS*/PS*/ES* tokens
    #[arg(long, env = "OIDC_JWKS")]
    jwks: Option<PathBuf>,

    /// Credential files, validated in order within one session
    #[arg(long, required = true, num_args = 1..)]
    credential: Vec<PathBuf>,

    /// Session TTL in seconds
    #[arg(long, default_value_t = 3600, env = "OIDC_SESSION_TTL")]
    session_ttl_secs: u64,

    /// Enable verbose logging
    #[arg(short, long, env = "OIDC_VERBOSE")]
    verbose: bool,
}

/// Tokens and request state for one validation, as stored on disk.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialFile {
    id_token: String,
    #[serde(default)]
    access_token: Option<String>,
    /// Nonce sent with the authentication request.
    #[serde(default)]
    nonce: Option<String>,
    /// Claims the userinfo endpoint would return for the access token.
    #[serde(default)]
    userinfo: ClaimSet,
}

impl CredentialFile {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credential file: {:?}", path))
    }

    fn into_credential(self) -> Result<(OidcCredential, ClaimSet)> {
        let mut credential = OidcCredential::parse(&self.id_token).context("Invalid ID token")?;
        if let Some(access_token) = self.access_token {
            credential = credential.with_access_token(AccessToken::new(access_token));
        }
        if let Some(nonce) = self.nonce {
            credential = credential.with_request(RequestContext::new().with_nonce(nonce));
        }
        Ok((credential, self.userinfo))
    }
}

/// Load a config file as an overlay onto the defaults, then validate it.
fn load_config(path: &Path) -> Result<OidcConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let json: OidcConfigJson = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    let mut config = OidcConfig::default();
    json.apply_to(&mut config);
    config
        .validate()
        .map_err(|e| anyhow!("Invalid OIDC configuration: {}", e))?;
    Ok(config)
}

/// Validate `credentials` in order within the session `id`.
fn validate_all(
    store: &SessionStore,
    id: SessionId,
    keys: &KeySet,
    config: &OidcConfig,
    credentials: Vec<CredentialFile>,
) -> Result<Vec<ValidationResult>> {
    let mut results = Vec::with_capacity(credentials.len());
    for file in credentials {
        let (credential, userinfo) = file.into_credential()?;
        let validator = CredentialValidator::new(JwtTokenValidator::new(keys.clone()))
            .with_user_info(StaticUserInfo::new(userinfo));
        results.push(store.validate(id, &validator, credential, config)?);
    }
    Ok(results)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Results go to stdout, logs to stderr
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = load_config(&args.config)?;
    let keys = match &args.jwks {
        Some(path) => KeySet::from_file(path)?,
        None => KeySet::empty(),
    };

    info!(
        issuer = %config.issuer,
        client_id = %config.client_id,
        algorithms = ?config.signing_algorithms,
        keys = keys.len(),
        "Configuration loaded"
    );

    let credentials = args
        .credential
        .iter()
        .map(|path| CredentialFile::load(path))
        .collect::<Result<Vec<_>>>()?;

    let store = Arc::new(SessionStore::new(args.session_ttl_secs));
    let cleanup = spawn_cleanup_task(Arc::clone(&store), DEFAULT_CLEANUP_INTERVAL_SECS);

    let id = store.create()?;
    debug!(session = %id, credentials = credentials.len(), "Validating credentials");
    let results = validate_all(&store, id, &keys, &config, credentials);
    cleanup.abort();
    let results = results?;

    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }

    if !results.iter().all(ValidationResult::is_valid) {
        bail!("Credential validation failed");
    }
    Ok(())
}
