use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use compute::period::validate_range;
use model::entities::{
    bank_statement,
    transaction::{self, TransactionType},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::handlers::bank_accounts::find_owned_account;
use crate::handlers::transactions::{adjust_balance, ensure_category};
use crate::helpers::cache::invalidate_user;
use crate::helpers::money::{checked_total, ensure_non_zero};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering an uploaded statement
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBankStatementRequest {
    /// Account the statement belongs to, must be owned by the caller
    pub bank_account_id: Option<i32>,
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub file_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct SetProcessedRequest {
    pub processed: bool,
}

/// One row of a statement import
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StatementTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub transaction_type: TransactionType,
    pub category_id: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ImportTransactionsRequest {
    #[validate(length(min = 1, max = 5000, message = "must contain between 1 and 5000 rows"))]
    pub transactions: Vec<StatementTransaction>,
}

/// Bank statement response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BankStatementResponse {
    pub id: i32,
    pub bank_account_id: Option<i32>,
    pub file_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub processed: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl From<bank_statement::Model> for BankStatementResponse {
    fn from(model: bank_statement::Model) -> Self {
        Self {
            id: model.id,
            bank_account_id: model.bank_account_id,
            file_name: model.file_name,
            start_date: model.start_date,
            end_date: model.end_date,
            processed: model.processed,
            uploaded_at: model.uploaded_at,
        }
    }
}

/// Outcome of a statement import
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportResult {
    pub statement_id: i32,
    pub imported: usize,
    /// Sum of imported credits
    pub total_credits: Decimal,
    /// Sum of imported debits, as a positive number
    pub total_debits: Decimal,
    pub net: Decimal,
    /// Balance of the linked account after the import
    pub account_balance: Option<Decimal>,
}

async fn find_owned_statement<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    statement_id: i32,
) -> Result<bank_statement::Model, ApiError> {
    bank_statement::Entity::find_by_id(statement_id)
        .filter(bank_statement::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Bank statement {} not found", statement_id);
            ApiError::not_found("Bank statement", statement_id)
        })
}

/// Checks every row against the statement before anything is written.
fn check_rows(
    statement: &bank_statement::Model,
    rows: &[StatementTransaction],
) -> Result<(), ApiError> {
    for (index, row) in rows.iter().enumerate() {
        if row.description.trim().is_empty() {
            return Err(ApiError::Validation(format!(
                "Invalid request: transactions[{}].description: must not be empty",
                index
            )));
        }
        ensure_non_zero(&format!("transactions[{}].amount", index), row.amount)?;
        if !statement.covers(row.date) {
            return Err(ApiError::bad_request(
                "DATE_OUTSIDE_STATEMENT",
                format!(
                    "Transaction dated {} is outside the statement period {} to {}",
                    row.date, statement.start_date, statement.end_date
                ),
            ));
        }
    }
    Ok(())
}

/// List the caller's bank statements
#[utoipa::path(
    get,
    path = "/api/bank-statements",
    tag = "bank-statements",
    responses(
        (status = 200, description = "List of bank statements", body = ApiResponse<Vec<BankStatementResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_bank_statements(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<BankStatementResponse>>>, ApiError> {
    trace!("Entering get_bank_statements function");
    let statements = bank_statement::Entity::find()
        .filter(bank_statement::Column::UserId.eq(user.id))
        .order_by_desc(bank_statement::Column::StartDate)
        .order_by_desc(bank_statement::Column::Id)
        .all(&state.db)
        .await?;

    info!("Retrieved {} bank statements", statements.len());
    let responses = statements
        .into_iter()
        .map(BankStatementResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(
        responses,
        "Bank statements retrieved successfully",
    )))
}

/// Register an uploaded statement
#[utoipa::path(
    post,
    path = "/api/bank-statements",
    tag = "bank-statements",
    request_body = CreateBankStatementRequest,
    responses(
        (status = 201, description = "Bank statement created", body = ApiResponse<BankStatementResponse>),
        (status = 400, description = "Invalid request or date range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn create_bank_statement(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateBankStatementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BankStatementResponse>>), ApiError> {
    trace!("Entering create_bank_statement function");
    validate_range(request.start_date, request.end_date)?;

    if let Some(account_id) = request.bank_account_id {
        if find_owned_account(&state.db, user.id, account_id)
            .await?
            .is_none()
        {
            warn!("Statement rejected, bank account {} not found", account_id);
            return Err(ApiError::bad_request(
                "INVALID_BANK_ACCOUNT",
                format!("Bank account with id {} does not exist", account_id),
            ));
        }
    }

    let statement = bank_statement::ActiveModel {
        user_id: Set(user.id),
        bank_account_id: Set(request.bank_account_id),
        file_name: Set(request.file_name.trim().to_string()),
        start_date: Set(request.start_date),
        end_date: Set(request.end_date),
        processed: Set(false),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Bank statement created with ID: {}", statement.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            BankStatementResponse::from(statement),
            "Bank statement created successfully",
        )),
    ))
}

/// Get a bank statement by ID
#[utoipa::path(
    get,
    path = "/api/bank-statements/{statement_id}",
    tag = "bank-statements",
    params(("statement_id" = i32, Path, description = "Bank statement ID")),
    responses(
        (status = 200, description = "Bank statement", body = ApiResponse<BankStatementResponse>),
        (status = 404, description = "Bank statement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_bank_statement(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(statement_id): Path<i32>,
) -> Result<Json<ApiResponse<BankStatementResponse>>, ApiError> {
    trace!("Entering get_bank_statement function");
    let statement = find_owned_statement(&state.db, user.id, statement_id).await?;
    Ok(Json(ApiResponse::ok(
        BankStatementResponse::from(statement),
        "Bank statement retrieved successfully",
    )))
}

/// Delete a bank statement, keeping its transactions
#[utoipa::path(
    delete,
    path = "/api/bank-statements/{statement_id}",
    tag = "bank-statements",
    params(("statement_id" = i32, Path, description = "Bank statement ID")),
    responses(
        (status = 200, description = "Bank statement deleted", body = ApiResponse<String>),
        (status = 404, description = "Bank statement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn delete_bank_statement(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(statement_id): Path<i32>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering delete_bank_statement function");
    let result = bank_statement::Entity::delete_many()
        .filter(bank_statement::Column::Id.eq(statement_id))
        .filter(bank_statement::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Bank statement", statement_id));
    }

    info!("Bank statement {} deleted", statement_id);
    Ok(Json(ApiResponse::ok(None, "Bank statement deleted successfully")))
}

/// Mark a statement processed or unprocessed
#[utoipa::path(
    patch,
    path = "/api/bank-statements/{statement_id}/processed",
    tag = "bank-statements",
    params(("statement_id" = i32, Path, description = "Bank statement ID")),
    request_body = SetProcessedRequest,
    responses(
        (status = 200, description = "Bank statement updated", body = ApiResponse<BankStatementResponse>),
        (status = 404, description = "Bank statement not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn set_statement_processed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(statement_id): Path<i32>,
    ApiJson(request): ApiJson<SetProcessedRequest>,
) -> Result<Json<ApiResponse<BankStatementResponse>>, ApiError> {
    trace!("Entering set_statement_processed function");
    let statement = find_owned_statement(&state.db, user.id, statement_id).await?;

    let mut active: bank_statement::ActiveModel = statement.into();
    active.processed = Set(request.processed);
    let updated = active.update(&state.db).await?;

    debug!(
        "Bank statement {} processed flag set to {}",
        statement_id, request.processed
    );
    Ok(Json(ApiResponse::ok(
        BankStatementResponse::from(updated),
        "Bank statement updated successfully",
    )))
}

/// Import the rows of a statement as transactions
#[utoipa::path(
    post,
    path = "/api/bank-statements/{statement_id}/transactions",
    tag = "bank-statements",
    params(("statement_id" = i32, Path, description = "Bank statement ID")),
    request_body = ImportTransactionsRequest,
    responses(
        (status = 201, description = "Transactions imported", body = ApiResponse<ImportResult>),
        (status = 400, description = "Invalid rows", body = ErrorResponse),
        (status = 404, description = "Bank statement not found", body = ErrorResponse),
        (status = 409, description = "Statement already processed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id, rows = request.transactions.len()))]
pub async fn import_statement_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(statement_id): Path<i32>,
    ApiJson(request): ApiJson<ImportTransactionsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ImportResult>>), ApiError> {
    trace!("Entering import_statement_transactions function");
    let txn = state.db.begin().await?;

    let statement = find_owned_statement(&txn, user.id, statement_id).await?;
    if statement.processed {
        warn!("Bank statement {} was already imported", statement_id);
        return Err(ApiError::conflict(
            "STATEMENT_ALREADY_PROCESSED",
            format!("Bank statement {} has already been processed", statement_id),
        ));
    }
    check_rows(&statement, &request.transactions)?;

    let category_ids: BTreeSet<i32> = request
        .transactions
        .iter()
        .filter_map(|row| row.category_id)
        .collect();
    for category_id in category_ids {
        ensure_category(&txn, Some(category_id)).await?;
    }

    let account = match statement.bank_account_id {
        Some(account_id) => find_owned_account(&txn, user.id, account_id).await?,
        None => None,
    };
    let mut running = account.as_ref().map(|a| a.balance);

    let now = Utc::now();
    let (mut total_credits, mut total_debits) = (Decimal::ZERO, Decimal::ZERO);
    for row in &request.transactions {
        let signed = row.transaction_type.signed(row.amount);
        match row.transaction_type {
            TransactionType::Credit => {
                total_credits = checked_total("total_credits", total_credits, signed)?
            }
            TransactionType::Debit => {
                total_debits = checked_total("total_debits", total_debits, -signed)?
            }
        }
        running = running
            .map(|balance| checked_total("balance", balance, signed))
            .transpose()?;

        transaction::ActiveModel {
            user_id: Set(user.id),
            bank_account_id: Set(account.as_ref().map(|a| a.id)),
            bank_statement_id: Set(Some(statement.id)),
            date: Set(row.date),
            description: Set(row.description.trim().to_string()),
            category_id: Set(row.category_id),
            amount: Set(signed),
            transaction_type: Set(row.transaction_type),
            balance: Set(running),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let net = total_credits - total_debits;
    let account_balance = match account {
        Some(account) => Some(adjust_balance(&txn, account, net).await?),
        None => None,
    };

    let mut active: bank_statement::ActiveModel = statement.into();
    active.processed = Set(true);
    active.update(&txn).await?;
    txn.commit().await?;

    invalidate_user(&state.cache, user.id);
    let imported = request.transactions.len();
    info!(
        "Imported {} transactions into bank statement {}",
        imported, statement_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ImportResult {
                statement_id,
                imported,
                total_credits,
                total_debits,
                net,
                account_balance,
            },
            "Transactions imported successfully",
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement() -> bank_statement::Model {
        bank_statement::Model {
            id: 1,
            user_id: 1,
            bank_account_id: None,
            file_name: "march.csv".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            processed: false,
            uploaded_at: Utc::now(),
        }
    }

    fn row(day: &str, amount: i64) -> StatementTransaction {
        StatementTransaction {
            date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
            description: "Coffee".to_string(),
            amount: Decimal::new(amount, 0),
            transaction_type: TransactionType::Debit,
            category_id: None,
        }
    }

    #[test]
    fn test_rows_inside_statement_pass() {
        let rows = vec![row("2024-03-01", 3), row("2024-03-31", 4)];
        assert!(check_rows(&statement(), &rows).is_ok());
    }

    #[test]
    fn test_row_outside_statement_is_rejected() {
        let rows = vec![row("2024-03-01", 3), row("2024-04-01", 4)];
        let err = check_rows(&statement(), &rows).unwrap_err();
        assert_eq!(err.code(), "DATE_OUTSIDE_STATEMENT");
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let rows = vec![row("2024-03-05", 0)];
        let err = check_rows(&statement(), &rows).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
