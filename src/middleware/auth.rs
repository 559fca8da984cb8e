// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token middleware for callable routes.

use crate::error::AppError;
use crate::services::firebase_auth::{CallerIdentity, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired ID token.";

/// Resolve the caller from the `Authorization` header.
///
/// Inserts an `Option<CallerIdentity>` extension: `None` when no header was
/// sent, so the handler decides how to treat anonymous calls. A header that
/// is present but fails verification is rejected here as `UNAUTHENTICATED`.
pub async fn resolve_caller(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller: Option<CallerIdentity> = match request.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => {
            let identity = state
                .token_verifier
                .verify_id_token(value)
                .await
                .map_err(|err| match err {
                    TokenError::Invalid(reason) => {
                        tracing::warn!(reason = %reason, "Rejected callable request: invalid ID token");
                        AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())
                    }
                    TokenError::Transient(reason) => {
                        AppError::Internal(anyhow::anyhow!("ID token verification failed: {reason}"))
                    }
                })?;
            Some(identity)
        }
    };

    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
