//! Checks on monetary input shared by the handlers.

use common::money::is_known_currency;
use rust_decimal::Decimal;

use crate::error::ApiError;

/// Upper-cases and checks an ISO 4217 code.
pub fn normalize_currency(code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_ascii_uppercase();
    if is_known_currency(&code) {
        Ok(code)
    } else {
        Err(ApiError::Validation(format!("Unknown currency code '{}'", code)))
    }
}

/// Amounts are stored as DECIMAL(16, 4).
const MAX_SCALE: u32 = 4;
const MAX_MAGNITUDE: i64 = 1_000_000_000_000;

/// Rejects amounts the money columns cannot hold.
pub fn ensure_storable(field: &str, amount: Decimal) -> Result<Decimal, ApiError> {
    if amount.abs() >= Decimal::from(MAX_MAGNITUDE) {
        return Err(ApiError::Validation(format!(
            "{} must be less than {} in magnitude",
            field, MAX_MAGNITUDE
        )));
    }
    if amount.normalize().scale() > MAX_SCALE {
        return Err(ApiError::Validation(format!(
            "{} must have at most {} decimal places",
            field, MAX_SCALE
        )));
    }
    Ok(amount)
}

/// `current + delta`, rejected when the sum overflows or cannot be stored.
pub fn checked_total(field: &str, current: Decimal, delta: Decimal) -> Result<Decimal, ApiError> {
    let total = current
        .checked_add(delta)
        .ok_or_else(|| ApiError::Validation(format!("{} is out of range", field)))?;
    ensure_storable(field, total)
}

pub fn ensure_positive(field: &str, amount: Decimal) -> Result<Decimal, ApiError> {
    let amount = ensure_storable(field, amount)?;
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(ApiError::Validation(format!("{} must be greater than zero", field)))
    }
}

pub fn ensure_non_negative(field: &str, amount: Decimal) -> Result<Decimal, ApiError> {
    let amount = ensure_storable(field, amount)?;
    if amount >= Decimal::ZERO {
        Ok(amount)
    } else {
        Err(ApiError::Validation(format!("{} must not be negative", field)))
    }
}

pub fn ensure_non_zero(field: &str, amount: Decimal) -> Result<Decimal, ApiError> {
    let amount = ensure_storable(field, amount)?;
    if amount.is_zero() {
        Err(ApiError::Validation(format!("{} must not be zero", field)))
    } else {
        Ok(amount)
    }
}
