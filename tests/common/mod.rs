// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subscription_pricing::config::Config;
use subscription_pricing::db::FirestoreDb;
use subscription_pricing::models::UserRecord;
use subscription_pricing::routes::create_router;
use subscription_pricing::services::{FirebaseTokenVerifier, PricingService};
use subscription_pricing::AppState;
use tower::ServiceExt;

pub const TEST_KID: &str = "test-kid";
const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/test_rsa_private.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/test_rsa_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Create a test app backed by the given store, with a static-key verifier.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let decoding_key =
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).expect("test public key should parse");
    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, decoding_key)
            .expect("static verifier should build"),
    );

    let state = Arc::new(AppState {
        config,
        pricing_service: PricingService::new(db.clone()),
        db,
        token_verifier,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(FirestoreDb::new_in_memory())
}

/// Claims of a Firebase ID token, with every field overridable.
#[derive(Serialize, Clone)]
#[allow(dead_code)]
pub struct TestClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    pub auth_time: u64,
    pub email: Option<String>,
}

impl TestClaims {
    #[allow(dead_code)]
    pub fn for_uid(uid: &str, config: &Config) -> Self {
        let now = now_secs();
        Self {
            iss: format!("https://securetoken.google.com/{}", config.gcp_project_id),
            aud: config.gcp_project_id.clone(),
            sub: uid.to_string(),
            exp: now + 3600,
            iat: now,
            auth_time: now,
            email: Some(format!("{uid}@example.com")),
        }
    }
}

/// Sign claims with the test RSA key.
#[allow(dead_code)]
pub fn sign_id_token(claims: &TestClaims, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("test private key should parse");
    encode(&header, claims, &key).expect("Failed to sign ID token")
}

/// Create a valid ID token for `uid`.
#[allow(dead_code)]
pub fn create_test_id_token(uid: &str, config: &Config) -> String {
    sign_id_token(&TestClaims::for_uid(uid, config), TEST_KID)
}

/// Store a user record with the given admin flag.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, uid: &str, is_admin: bool) {
    state
        .db
        .upsert_user(uid, &UserRecord { is_admin })
        .await
        .expect("Failed to seed user");
}

/// POST a callable request and return the status and parsed JSON body.
#[allow(dead_code)]
pub async fn call(app: axum::Router, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/updateSubscriptionPricing")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// The `error.status` field of a callable error reply.
#[allow(dead_code)]
pub fn error_status(body: &Value) -> &str {
    body["error"]["status"].as_str().unwrap_or("")
}
