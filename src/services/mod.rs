// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod pricing;

pub use firebase_auth::{CallerIdentity, FirebaseTokenVerifier, TokenError};
pub use pricing::PricingService;
