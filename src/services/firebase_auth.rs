// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification for callable requests.

use crate::config::Config;
use crate::time_utils::now_unix_secs;
use anyhow::Context;
use axum::http::HeaderValue;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Authenticated principal attached to a callable invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Firebase uid (token `sub`), also the `users` document ID
    pub uid: String,
    pub email: Option<String>,
}

/// ID token verification error categories.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// The token is missing/invalid or claims do not match expectations.
    Invalid(String),
    /// Keys could not be fetched; the token itself may be fine.
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
    /// Auth emulator tokens are unsigned; only the claims are checked.
    Emulator,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase Auth ID tokens.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    project_id: String,
    issuer: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Pick the emulator verifier when the auth emulator is configured,
    /// otherwise the production verifier.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match &config.auth_emulator_host {
            Some(host) => {
                tracing::warn!(
                    emulator_host = %host,
                    "Accepting unsigned Firebase Auth emulator tokens"
                );
                Self::with_mode(config, VerifierMode::Emulator)
            }
            None => Self::new(config),
        }
    }

    /// Create a production verifier that fetches and caches Google's secure-token keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::with_mode(config, VerifierMode::Google)?;

        tracing::info!(
            project = %verifier.project_id,
            issuer = %verifier.issuer,
            "Initialized Firebase ID token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Self::with_mode(
            config,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let project_id = config.gcp_project_id.trim().to_string();
        if project_id.is_empty() {
            anyhow::bail!("project id must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            project_id,
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify the ID token in an `Authorization: Bearer` header.
    pub async fn verify_id_token(
        &self,
        auth_header: &HeaderValue,
    ) -> Result<CallerIdentity, TokenError> {
        let token = extract_bearer_token(auth_header)?;

        let claims = match self.mode {
            VerifierMode::Emulator => decode_unsigned_claims(token)?,
            _ => self.decode_signed_claims(token).await?,
        };

        check_claims(&claims, &self.project_id, &self.issuer, now_unix_secs())?;

        tracing::debug!(
            uid = %claims.sub,
            provider = claims
                .firebase
                .as_ref()
                .and_then(|f| f.sign_in_provider.as_deref())
                .unwrap_or("<unknown>"),
            "Firebase ID token verified"
        );

        Ok(CallerIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }

    async fn decode_signed_claims(&self, token: &str) -> Result<FirebaseIdTokenClaims, TokenError> {
        let header = decode_header(token)
            .map_err(|e| TokenError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(format!("JWT validation failed: {e}")))
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(TokenError::Invalid(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Google | VerifierMode::Emulator => {}
        }

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(TokenError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), TokenError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = SECURE_TOKEN_JWKS_URL, "Refreshing secure-token JWKS cache");

        let response = self
            .http_client
            .get(SECURE_TOKEN_JWKS_URL)
            .send()
            .await
            .map_err(|e| TokenError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TokenError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| TokenError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);

        if keys_by_kid.is_empty() {
            return Err(TokenError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Secure-token JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    exp: u64,
    iat: Option<u64>,
    auth_time: Option<u64>,
    email: Option<String>,
    firebase: Option<FirebaseClaim>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaim {
    sign_in_provider: Option<String>,
}

/// Keep RS256 signing keys, indexed by kid.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn extract_bearer_token(auth_header: &HeaderValue) -> Result<&str, TokenError> {
    let value = auth_header
        .to_str()
        .map_err(|_| TokenError::Invalid("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        TokenError::Invalid("Authorization header must be Bearer token".to_string())
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Invalid("Bearer token is empty".to_string()));
    }

    Ok(token)
}

/// Read the claims of an unsigned emulator token (`alg: none`).
fn decode_unsigned_claims(token: &str) -> Result<FirebaseIdTokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(TokenError::Invalid("malformed JWT".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Invalid(format!("invalid JWT payload encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Invalid(format!("invalid JWT claims: {e}")))
}

/// Firebase-specific claim rules, applied after signature checks.
fn check_claims(
    claims: &FirebaseIdTokenClaims,
    project_id: &str,
    issuer: &str,
    now: u64,
) -> Result<(), TokenError> {
    if claims.aud != project_id {
        return Err(TokenError::Invalid(format!(
            "unexpected audience: {}",
            claims.aud
        )));
    }
    if claims.iss != issuer {
        return Err(TokenError::Invalid(format!(
            "unexpected issuer: {}",
            claims.iss
        )));
    }
    if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
        return Err(TokenError::Invalid("invalid sub claim".to_string()));
    }
    if claims.exp.saturating_add(CLOCK_SKEW_SECS) <= now {
        return Err(TokenError::Invalid("token has expired".to_string()));
    }

    let latest_issue = now.saturating_add(CLOCK_SKEW_SECS);

    let Some(iat) = claims.iat else {
        return Err(TokenError::Invalid("missing iat claim".to_string()));
    };
    if iat > latest_issue {
        return Err(TokenError::Invalid("iat claim is in the future".to_string()));
    }
    if claims
        .auth_time
        .is_some_and(|auth_time| auth_time > latest_issue)
    {
        return Err(TokenError::Invalid(
            "auth_time claim is in the future".to_string(),
        ));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}
