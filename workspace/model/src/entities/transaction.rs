use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of money movement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Money going out.
    #[sea_orm(string_value = "debit")]
    Debit,
}

impl TransactionType {
    /// Apply this type's sign to an amount: credits are positive, debits negative.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Credit => amount.abs(),
            TransactionType::Debit => -amount.abs(),
        }
    }
}

/// A single bank transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub bank_account_id: Option<i32>,
    pub bank_statement_id: Option<i32>,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: Option<i32>,
    /// Signed value: positive for credits, negative for debits.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    /// Account balance right after this transaction was recorded.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub balance: Option<Decimal>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::bank_account::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_account::Column::Id",
        on_delete = "Cascade"
    )]
    BankAccount,
    #[sea_orm(
        belongs_to = "super::bank_statement::Entity",
        from = "Column::BankStatementId",
        to = "super::bank_statement::Column::Id",
        on_delete = "SetNull"
    )]
    BankStatement,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::bank_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccount.def()
    }
}

impl Related<super::bank_statement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankStatement.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_debit(&self) -> bool {
        self.transaction_type == TransactionType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }
}
