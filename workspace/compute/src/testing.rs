//! Builders for in-memory rows used by the unit tests.

use chrono::{NaiveDate, Utc};
use model::entities::transaction::TransactionType;
use model::entities::{category, transaction};
use rust_decimal::Decimal;

/// A transaction whose type follows the sign of `amount`.
pub fn tx(id: i32, date: &str, amount: Decimal, category_id: Option<i32>) -> transaction::Model {
    let transaction_type = if amount.is_sign_negative() {
        TransactionType::Debit
    } else {
        TransactionType::Credit
    };

    transaction::Model {
        id,
        user_id: 1,
        bank_account_id: Some(1),
        bank_statement_id: None,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        description: format!("Transaction {}", id),
        category_id,
        amount,
        transaction_type,
        balance: None,
        created_at: Utc::now(),
    }
}

pub fn make_category(id: i32, name: &str) -> category::Model {
    category::Model {
        id,
        name: name.to_string(),
        color: "#6B7280".to_string(),
        icon: "circle".to_string(),
        is_default: true,
    }
}
