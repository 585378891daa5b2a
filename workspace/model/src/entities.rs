//! SeaORM entities for the FinSavvy schema.
//!
//! Eight tables: users own bank accounts, statements, transactions, goals,
//! insights and one notification-preference row; categories are shared.

pub mod bank_account;
pub mod bank_statement;
pub mod category;
pub mod goal;
pub mod insight;
pub mod notification_preference;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::bank_account::Entity as BankAccount;
    pub use super::bank_statement::Entity as BankStatement;
    pub use super::category::Entity as Category;
    pub use super::goal::Entity as Goal;
    pub use super::insight::Entity as Insight;
    pub use super::notification_preference::Entity as NotificationPreference;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn insert_user(db: &DatabaseConnection, email: &str) -> Result<user::Model, DbErr> {
        let now = Utc::now();
        user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
            name: Set("Test".to_string()),
            currency: Set("USD".to_string()),
            monthly_salary: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let now = Utc::now();

        let owner = insert_user(&db, "owner@example.com").await?;

        // Seeded categories are present
        let categories = Category::find().all(&db).await?;
        assert!(categories.len() >= 10);
        assert!(categories.iter().all(|c| c.is_default));
        let groceries = categories
            .iter()
            .find(|c| c.name == "Food & Dining")
            .expect("seeded category");

        let account = bank_account::ActiveModel {
            user_id: Set(owner.id),
            name: Set("Checking".to_string()),
            account_type: Set(bank_account::AccountType::Checking),
            account_number: Set("****1234".to_string()),
            balance: Set(Decimal::new(100000, 2)),
            color: Set("#4F46E5".to_string()),
            short_code: Set("CHK".to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let statement = bank_statement::ActiveModel {
            user_id: Set(owner.id),
            bank_account_id: Set(Some(account.id)),
            file_name: Set("january.pdf".to_string()),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            processed: Set(false),
            uploaded_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert!(statement.covers(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        assert!(!statement.covers(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));

        let tx = transaction::ActiveModel {
            user_id: Set(owner.id),
            bank_account_id: Set(Some(account.id)),
            bank_statement_id: Set(Some(statement.id)),
            date: Set(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            description: Set("Supermarket".to_string()),
            category_id: Set(Some(groceries.id)),
            amount: Set(Decimal::new(-5000, 2)),
            transaction_type: Set(transaction::TransactionType::Debit),
            balance: Set(Some(Decimal::new(95000, 2))),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Statement rows resolve back to their transactions
        let imported = statement.find_related(Transaction).all(&db).await?;
        assert_eq!(imported.len(), 1);
        let parent = tx.find_related(BankStatement).one(&db).await?;
        assert_eq!(parent.map(|s| s.id), Some(statement.id));

        let goal = goal::ActiveModel {
            user_id: Set(owner.id),
            name: Set("Emergency fund".to_string()),
            description: Set(None),
            target_amount: Set(Decimal::new(1000, 0)),
            current_amount: Set(Decimal::new(250, 0)),
            deadline: Set(None),
            is_ai_generated: Set(false),
            status: Set(goal::GoalStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert_eq!(goal.progress_percentage(), 25.0);

        insight::ActiveModel {
            user_id: Set(owner.id),
            title: Set("Groceries".to_string()),
            description: Set("Most of your spending went to food".to_string()),
            insight_type: Set(insight::InsightType::Info),
            category: Set(Some("Food & Dining".to_string())),
            related_transactions: Set(Some(serde_json::json!([tx.id]))),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        notification_preference::ActiveModel {
            user_id: Set(owner.id),
            monthly_summary: Set(true),
            goal_updates: Set(true),
            insight_alerts: Set(false),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // Read back through relations
        let owned_transactions = owner.find_related(Transaction).all(&db).await?;
        assert_eq!(owned_transactions.len(), 1);
        assert_eq!(owned_transactions[0].amount, Decimal::new(-5000, 2));
        assert!(owned_transactions[0].is_debit());

        let stored = Insight::find()
            .filter(insight::Column::UserId.eq(owner.id))
            .one(&db)
            .await?
            .expect("insight stored");
        assert_eq!(stored.related_transaction_ids(), vec![tx.id]);

        // Deleting the user cascades to every owned row
        User::delete_by_id(owner.id).exec(&db).await?;
        assert_eq!(BankAccount::find().all(&db).await?.len(), 0);
        assert_eq!(Transaction::find().all(&db).await?.len(), 0);
        assert_eq!(Goal::find().all(&db).await?.len(), 0);
        assert_eq!(NotificationPreference::find().all(&db).await?.len(), 0);
        assert_eq!(BankStatement::find().all(&db).await?.len(), 0);

        // Categories are shared and survive
        assert!(Category::find().all(&db).await?.len() >= 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_email_is_unique() -> Result<(), DbErr> {
        let db = setup_db().await?;

        insert_user(&db, "dup@example.com").await?;
        let second = insert_user(&db, "dup@example.com").await;

        assert!(second.is_err());
        Ok(())
    }
}
