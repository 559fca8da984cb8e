// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription Pricing API Server
//!
//! Serves the `updateSubscriptionPricing` callable endpoint used by the
//! debt tracker admin screens.

use std::sync::Arc;
use subscription_pricing::{
    config::{Config, StorageBackend},
    db::FirestoreDb,
    services::{FirebaseTokenVerifier, PricingService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        project = %config.gcp_project_id,
        backend = ?config.storage_backend,
        "Starting Subscription Pricing API"
    );

    let db = match config.storage_backend {
        StorageBackend::Firestore => FirestoreDb::new(&config.gcp_project_id).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            FirestoreDb::new_in_memory()
        }
    };

    let token_verifier = Arc::new(FirebaseTokenVerifier::from_config(&config)?);
    let pricing_service = PricingService::new(db.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        pricing_service,
        token_verifier,
    });

    let app = subscription_pricing::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("subscription_pricing=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
