// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod pricing;
pub mod user;

pub use pricing::{PricingConfig, PricingUpdateRequest, UpdatePricingResponse};
pub use user::UserRecord;
