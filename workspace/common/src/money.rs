//! Currency helpers on top of `rusty_money`'s ISO 4217 table.

use rust_decimal::Decimal;
use rusty_money::{iso, Money};

/// True when `code` is a known ISO 4217 currency code.
pub fn is_known_currency(code: &str) -> bool {
    iso::find(code).is_some()
}

/// Formats `amount` the way the currency is usually written, e.g. `$1,234.50`.
///
/// Unknown codes fall back to `1234.50 XYZ`.
pub fn format_amount(amount: Decimal, code: &str) -> String {
    match iso::find(code) {
        Some(currency) => Money::from_decimal(amount, currency).to_string(),
        None => format!("{:.2} {}", amount, code),
    }
}
