use std::collections::HashMap;

use chrono::NaiveDate;
use model::entities::{category, transaction};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use crate::error::Result;

/// Loads a user's transactions dated within `[start, end]`, oldest first.
#[instrument(skip(db))]
pub async fn load_transactions(
    db: &DatabaseConnection,
    user_id: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<transaction::Model>> {
    let transactions = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Date.between(start, end))
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    debug!("Loaded {} transactions", transactions.len());
    Ok(transactions)
}

/// Loads all categories keyed by id.
#[instrument(skip(db))]
pub async fn load_categories(db: &DatabaseConnection) -> Result<HashMap<i32, category::Model>> {
    let categories = category::Entity::find().all(db).await?;
    Ok(categories.into_iter().map(|c| (c.id, c)).collect())
}
