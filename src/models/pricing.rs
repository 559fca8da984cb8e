// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription pricing models and payload validation.
//!
//! Callers send loosely typed JSON. [`PricingUpdateRequest::from_payload`]
//! turns it into a checked value or an `InvalidArgument` error; nothing
//! downstream ever sees an unvalidated price.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Currency stored when the caller omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

pub const MISSING_DATA_MESSAGE: &str = "Missing request data.";
// U+2011 NON-BREAKING HYPHEN in "non‑negative"
pub const INVALID_MONTHLY_MESSAGE: &str = "Monthly price must be a non\u{2011}negative number.";
pub const INVALID_YEARLY_MESSAGE: &str = "Yearly price must be a non\u{2011}negative number.";

/// A validated pricing update.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingUpdateRequest {
    pub monthly_price: f64,
    pub yearly_price: f64,
    /// Trimmed, never empty
    pub currency: String,
}

impl PricingUpdateRequest {
    /// Validate a raw callable payload.
    ///
    /// The payload must be a JSON object or array. Both prices are coerced
    /// the way a JavaScript client's `Number(x)` would and must come out
    /// finite and non-negative. Monthly is checked before yearly.
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, AppError> {
        let no_fields = Map::new();
        let data = match payload {
            Some(Value::Object(map)) => map,
            // Arrays pass the shape check but have no named fields
            Some(Value::Array(_)) => &no_fields,
            _ => return Err(AppError::InvalidArgument(MISSING_DATA_MESSAGE.to_string())),
        };

        let monthly_price = coerce_number(data.get("monthlyPrice"));
        let yearly_price = coerce_number(data.get("yearlyPrice"));
        let currency = normalize_currency(data.get("currency"));

        if !is_valid_price(monthly_price) {
            return Err(AppError::InvalidArgument(
                INVALID_MONTHLY_MESSAGE.to_string(),
            ));
        }
        if !is_valid_price(yearly_price) {
            return Err(AppError::InvalidArgument(INVALID_YEARLY_MESSAGE.to_string()));
        }

        Ok(Self {
            monthly_price,
            yearly_price,
            currency,
        })
    }

    /// Fields written to the pricing document, minus the timestamp.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("monthlyPrice".to_string(), Value::from(self.monthly_price));
        fields.insert("yearlyPrice".to_string(), Value::from(self.yearly_price));
        fields.insert("currency".to_string(), Value::from(self.currency.clone()));
        fields
    }
}

fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

/// Use the trimmed currency string, or the default when absent, blank, or not a string.
fn normalize_currency(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

/// Numeric coercion matching JavaScript's `Number(x)` for JSON inputs.
///
/// Returns NaN for anything that does not convert.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => coerce_str(s),
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce_array_element(single),
            _ => f64::NAN,
        },
        Some(Value::Object(_)) => f64::NAN,
    }
}

/// A one-element array converts through the element's string form.
fn coerce_array_element(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Number(_) | Value::String(_) | Value::Array(_) => coerce_number(Some(value)),
        // "true", "false" and "[object Object]" are not numeric strings
        Value::Bool(_) | Value::Object(_) => f64::NAN,
    }
}

fn coerce_str(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    let radix_prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| s.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix_prefixed {
        return parse_radix(digits, radix);
    }

    // Rust also accepts spellings like "inf" and "nan"; both end up rejected
    // as non-finite, same as the JavaScript result.
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// The singleton pricing document as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub currency: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Successful callable result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePricingResponse {
    pub success: bool,
}

impl UpdatePricingResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
