use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// A registered FinSavvy user.
///
/// Every other per-user row (accounts, statements, transactions, goals,
/// insights, notification preferences) hangs off this one and is removed
/// with it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Login identifier, stored with a lower-cased domain part.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 hash in PHC string format.
    pub password_hash: String,
    pub name: String,
    /// ISO 4217 code used when displaying amounts to this user.
    pub currency: String,
    /// Set during onboarding; used for savings-rate hints and insights.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub monthly_salary: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bank_account::Entity")]
    BankAccount,
    #[sea_orm(has_many = "super::bank_statement::Entity")]
    BankStatement,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
    #[sea_orm(has_many = "super::goal::Entity")]
    Goal,
    #[sea_orm(has_many = "super::insight::Entity")]
    Insight,
    #[sea_orm(has_one = "super::notification_preference::Entity")]
    NotificationPreference,
}

impl Related<super::bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccount.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goal.def()
    }
}

impl Related<super::notification_preference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationPreference.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
