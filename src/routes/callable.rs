// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable-protocol routes.
//!
//! Requests are `POST` with a JSON body `{"data": ...}`; successful replies
//! are `{"result": ...}`. Errors use the envelope rendered by `AppError`.

use crate::error::{AppError, Result};
use crate::models::UpdatePricingResponse;
use crate::services::firebase_auth::CallerIdentity;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Callable routes. The caller middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/updateSubscriptionPricing",
        post(update_subscription_pricing),
    )
}

/// Successful callable reply.
#[derive(Serialize)]
pub struct CallableResult<T> {
    pub result: T,
}

/// Extract `data` from a callable request body.
///
/// `Ok(None)` means the envelope was well-formed but `data` was `null`.
fn parse_envelope(headers: &HeaderMap, body: &[u8]) -> Result<Option<Value>> {
    let bad_request = || AppError::InvalidArgument(AppError::BAD_REQUEST.to_string());

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err(bad_request());
    }

    let envelope: Value = serde_json::from_slice(body).map_err(|_| bad_request())?;
    let data = envelope
        .as_object()
        .and_then(|obj| obj.get("data"))
        .ok_or_else(bad_request)?;

    Ok(match data {
        Value::Null => None,
        other => Some(other.clone()),
    })
}

/// `updateSubscriptionPricing`: admin-only merge-write of the pricing document.
async fn update_subscription_pricing(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Option<CallerIdentity>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallableResult<UpdatePricingResponse>>> {
    let data = parse_envelope(&headers, &body).inspect_err(|_| {
        tracing::info!("Rejected malformed callable envelope");
    })?;

    let result = state
        .pricing_service
        .update_pricing(caller.as_ref(), data.as_ref())
        .await?;

    Ok(Json(CallableResult { result }))
}
