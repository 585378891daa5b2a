//! Analytics over a user's transactions: category breakdowns, monthly
//! summaries, bucketed spending charts and rule-based insights.
//!
//! The computers are pure functions over loaded rows; the async helpers at
//! the bottom load the rows for one user and run them.

pub mod categories;
pub mod chart;
pub mod error;
pub mod insights;
pub mod loader;
pub mod period;
pub mod summary;

#[cfg(test)]
mod testing;

use chrono::NaiveDate;
use common::{CategoryBreakdown, ChartInterval, MonthlySummary, SpendingChart};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tracing::instrument;

use categories::CategoriesComputer;
use chart::ChartComputer;
use error::Result;
use period::MonthPeriod;

/// Category breakdown of a user's spending in `period`.
#[instrument(skip(db))]
pub async fn category_breakdown(
    db: &DatabaseConnection,
    user_id: i32,
    period: MonthPeriod,
) -> Result<CategoryBreakdown> {
    let transactions = loader::load_transactions(db, user_id, period.start, period.end).await?;
    let categories = loader::load_categories(db).await?;
    Ok(CategoriesComputer::new().compute(&period, &transactions, &categories))
}

/// Income/expense summary of a user's `period`.
#[instrument(skip(db))]
pub async fn monthly_summary(
    db: &DatabaseConnection,
    user_id: i32,
    period: MonthPeriod,
    monthly_salary: Option<Decimal>,
) -> Result<MonthlySummary> {
    let transactions = loader::load_transactions(db, user_id, period.start, period.end).await?;
    Ok(summary::monthly_summary(&period, &transactions, monthly_salary))
}

/// Spending chart of a user between `start` and `end` inclusive.
#[instrument(skip(db))]
pub async fn spending_chart(
    db: &DatabaseConnection,
    user_id: i32,
    interval: ChartInterval,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SpendingChart> {
    let computer = ChartComputer::new(interval);
    // Reject oversized ranges before touching the database
    computer.buckets(start, end)?;
    let transactions = loader::load_transactions(db, user_id, start, end).await?;
    computer.compute(start, end, &transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use model::entities::transaction::TransactionType;
    use model::entities::{category, transaction, user};
    use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};

    async fn setup() -> (DatabaseConnection, i32, i32) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let now = Utc::now();
        let user = user::ActiveModel {
            email: Set("analytics@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            name: Set("Analytics".to_string()),
            currency: Set("USD".to_string()),
            monthly_salary: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let food = category::Entity::find()
            .filter(category::Column::Name.eq("Food & Dining"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();

        (db, user.id, food.id)
    }

    async fn insert(db: &DatabaseConnection, user_id: i32, date: &str, cents: i64, category_id: Option<i32>) {
        let amount = Decimal::new(cents, 2);
        transaction::ActiveModel {
            user_id: Set(user_id),
            bank_account_id: Set(None),
            bank_statement_id: Set(None),
            date: Set(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
            description: Set("row".to_string()),
            category_id: Set(category_id),
            amount: Set(amount),
            transaction_type: Set(if cents < 0 {
                TransactionType::Debit
            } else {
                TransactionType::Credit
            }),
            balance: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_breakdown_sums_match_database() {
        let (db, user_id, food_id) = setup().await;
        insert(&db, user_id, "2024-07-01", -1250, Some(food_id)).await;
        insert(&db, user_id, "2024-07-10", -799, Some(food_id)).await;
        insert(&db, user_id, "2024-07-11", -4001, None).await;
        insert(&db, user_id, "2024-07-12", 300000, None).await;
        insert(&db, user_id, "2024-08-01", -5000, Some(food_id)).await;

        let period = MonthPeriod::new(2024, 7).unwrap();
        let breakdown = category_breakdown(&db, user_id, period).await.unwrap();

        assert_eq!(breakdown.total_spending, Decimal::new(6050, 2));
        let grouped: Decimal = breakdown.categories.iter().map(|c| c.total).sum();
        assert_eq!(grouped, breakdown.total_spending);
        assert_eq!(breakdown.categories[0].category_name, "Uncategorized");

        let summary = monthly_summary(&db, user_id, period, None).await.unwrap();
        assert_eq!(summary.total_income, Decimal::new(300000, 2));
        assert_eq!(summary.transaction_count, 4);
    }

    #[tokio::test]
    async fn test_chart_rejects_large_range() {
        let (db, user_id, _) = setup().await;
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let result = spending_chart(&db, user_id, ChartInterval::Daily, start, end).await;
        assert!(matches!(result, Err(error::ComputeError::RangeTooLarge { .. })));

        let chart = spending_chart(&db, user_id, ChartInterval::Monthly, start, end)
            .await
            .unwrap();
        assert_eq!(chart.points.len(), 49);
    }
}
