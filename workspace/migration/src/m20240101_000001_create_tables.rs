use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string(Users::Name))
                    .col(string_len(Users::Currency, 3).default("USD"))
                    .col(decimal_null(Users::MonthlySalary).decimal_len(16, 4))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .col(timestamp_with_time_zone(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string(Categories::Name).unique_key())
                    .col(string(Categories::Color))
                    .col(string(Categories::Icon))
                    .col(boolean(Categories::IsDefault).default(false))
                    .to_owned(),
            )
            .await?;

        // Create bank_accounts table
        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(pk_auto(BankAccounts::Id))
                    .col(integer(BankAccounts::UserId))
                    .col(string(BankAccounts::Name))
                    .col(string_len(BankAccounts::AccountType, 20))
                    .col(string(BankAccounts::AccountNumber))
                    .col(decimal(BankAccounts::Balance).decimal_len(16, 4).default(0))
                    .col(string(BankAccounts::Color).default("#4F46E5"))
                    .col(string(BankAccounts::ShortCode))
                    .col(timestamp_with_time_zone(BankAccounts::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_account_user")
                            .from(BankAccounts::Table, BankAccounts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create bank_statements table
        manager
            .create_table(
                Table::create()
                    .table(BankStatements::Table)
                    .if_not_exists()
                    .col(pk_auto(BankStatements::Id))
                    .col(integer(BankStatements::UserId))
                    .col(integer_null(BankStatements::BankAccountId))
                    .col(string(BankStatements::FileName))
                    .col(date(BankStatements::StartDate))
                    .col(date(BankStatements::EndDate))
                    .col(boolean(BankStatements::Processed).default(false))
                    .col(timestamp_with_time_zone(BankStatements::UploadedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_statement_user")
                            .from(BankStatements::Table, BankStatements::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_statement_account")
                            .from(BankStatements::Table, BankStatements::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::UserId))
                    .col(integer_null(Transactions::BankAccountId))
                    .col(integer_null(Transactions::BankStatementId))
                    .col(date(Transactions::Date))
                    .col(string(Transactions::Description))
                    .col(integer_null(Transactions::CategoryId))
                    .col(decimal(Transactions::Amount).decimal_len(16, 4))
                    .col(string_len(Transactions::TransactionType, 10))
                    .col(decimal_null(Transactions::Balance).decimal_len(16, 4))
                    .col(timestamp_with_time_zone(Transactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_account")
                            .from(Transactions::Table, Transactions::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_statement")
                            .from(Transactions::Table, Transactions::BankStatementId)
                            .to(BankStatements::Table, BankStatements::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_category")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_user_date")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // Create goals table
        manager
            .create_table(
                Table::create()
                    .table(Goals::Table)
                    .if_not_exists()
                    .col(pk_auto(Goals::Id))
                    .col(integer(Goals::UserId))
                    .col(string(Goals::Name))
                    .col(string_null(Goals::Description))
                    .col(decimal(Goals::TargetAmount).decimal_len(16, 4))
                    .col(decimal(Goals::CurrentAmount).decimal_len(16, 4).default(0))
                    .col(date_null(Goals::Deadline))
                    .col(boolean(Goals::IsAiGenerated).default(false))
                    .col(string_len(Goals::Status, 10).default("active"))
                    .col(timestamp_with_time_zone(Goals::CreatedAt))
                    .col(timestamp_with_time_zone(Goals::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goal_user")
                            .from(Goals::Table, Goals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create insights table
        manager
            .create_table(
                Table::create()
                    .table(Insights::Table)
                    .if_not_exists()
                    .col(pk_auto(Insights::Id))
                    .col(integer(Insights::UserId))
                    .col(string(Insights::Title))
                    .col(text(Insights::Description))
                    .col(string_len(Insights::InsightType, 10))
                    .col(string_null(Insights::Category))
                    .col(json_null(Insights::RelatedTransactions))
                    .col(timestamp_with_time_zone(Insights::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_insight_user")
                            .from(Insights::Table, Insights::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create notification_preferences table
        manager
            .create_table(
                Table::create()
                    .table(NotificationPreferences::Table)
                    .if_not_exists()
                    .col(pk_auto(NotificationPreferences::Id))
                    .col(integer(NotificationPreferences::UserId).unique_key())
                    .col(boolean(NotificationPreferences::MonthlySummary).default(true))
                    .col(boolean(NotificationPreferences::GoalUpdates).default(true))
                    .col(boolean(NotificationPreferences::InsightAlerts).default(true))
                    .col(timestamp_with_time_zone(NotificationPreferences::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_preference_user")
                            .from(NotificationPreferences::Table, NotificationPreferences::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationPreferences::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Insights::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Goals::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BankStatements::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    Name,
    Currency,
    MonthlySalary,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Categories {
    Table,
    Id,
    Name,
    Color,
    Icon,
    IsDefault,
}

#[derive(DeriveIden)]
enum BankAccounts {
    Table,
    Id,
    UserId,
    Name,
    AccountType,
    AccountNumber,
    Balance,
    Color,
    ShortCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankStatements {
    Table,
    Id,
    UserId,
    BankAccountId,
    FileName,
    StartDate,
    EndDate,
    Processed,
    UploadedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    BankAccountId,
    BankStatementId,
    Date,
    Description,
    CategoryId,
    Amount,
    TransactionType,
    Balance,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Goals {
    Table,
    Id,
    UserId,
    Name,
    Description,
    TargetAmount,
    CurrentAmount,
    Deadline,
    IsAiGenerated,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Insights {
    Table,
    Id,
    UserId,
    Title,
    Description,
    InsightType,
    Category,
    RelatedTransactions,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NotificationPreferences {
    Table,
    Id,
    UserId,
    MonthlySummary,
    GoalUpdates,
    InsightAlerts,
    UpdatedAt,
}
