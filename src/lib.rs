// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Subscription pricing: admin-only callable endpoint for the debt tracker app.
//!
//! This crate provides the backend that lets administrators update the
//! subscription prices stored in the shared Firestore pricing document.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, PricingService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub pricing_service: PricingService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
