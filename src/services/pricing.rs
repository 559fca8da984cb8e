// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only subscription pricing updates.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{PricingUpdateRequest, UpdatePricingResponse};
use crate::services::firebase_auth::CallerIdentity;
use serde_json::Value;

pub const UNAUTHENTICATED_MESSAGE: &str = "Sign in to update pricing.";
pub const PERMISSION_DENIED_MESSAGE: &str = "Only admins can update subscription pricing.";

/// Applies pricing updates after authenticating and authorizing the caller.
///
/// Holds no state of its own between calls; concurrent writes to the pricing
/// document are serialized by the store.
#[derive(Clone)]
pub struct PricingService {
    db: FirestoreDb,
}

impl PricingService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Validate and persist a pricing update.
    ///
    /// Checks run in order and stop at the first failure:
    /// caller present, caller is admin, payload is an object, prices valid.
    /// Only then is the pricing document merge-written, exactly once.
    ///
    /// The admin read and the write are not transactional.
    pub async fn update_pricing(
        &self,
        caller: Option<&CallerIdentity>,
        payload: Option<&Value>,
    ) -> Result<UpdatePricingResponse> {
        let Some(caller) = caller else {
            tracing::info!("Rejected pricing update without caller identity");
            return Err(AppError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()));
        };

        self.require_admin(caller).await?;

        let update = PricingUpdateRequest::from_payload(payload).inspect_err(|err| {
            tracing::info!(uid = %caller.uid, error = %err, "Rejected pricing payload");
        })?;

        let written_at = self.db.merge_pricing_config(&update).await?;

        tracing::info!(
            uid = %caller.uid,
            monthly_price = update.monthly_price,
            yearly_price = update.yearly_price,
            currency = %update.currency,
            last_updated = %written_at,
            "Subscription pricing updated"
        );

        Ok(UpdatePricingResponse::ok())
    }

    async fn require_admin(&self, caller: &CallerIdentity) -> Result<()> {
        let is_admin = self
            .db
            .get_user(&caller.uid)
            .await?
            .is_some_and(|user| user.is_admin);

        if !is_admin {
            tracing::warn!(uid = %caller.uid, "Non-admin attempted pricing update");
            return Err(AppError::PermissionDenied(
                PERMISSION_DENIED_MESSAGE.to_string(),
            ));
        }

        Ok(())
    }
}
