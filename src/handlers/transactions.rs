use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use compute::period::{validate_range, MonthPeriod};
use model::entities::{
    bank_account, bank_statement, category,
    transaction::{self, TransactionType},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::bank_accounts::find_owned_account;
use crate::helpers::cache::invalidate_user;
use crate::helpers::money::{checked_total, ensure_non_zero};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 500;

/// Request body for recording a transaction
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    /// Account the transaction is booked on, must belong to the caller
    pub bank_account_id: i32,
    /// Optional statement the transaction came from
    pub bank_statement_id: Option<i32>,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 500, message = "must be between 1 and 500 characters"))]
    pub description: String,
    pub category_id: Option<i32>,
    /// Non-zero amount; the sign is derived from `transaction_type`
    pub amount: Decimal,
    /// credit or debit
    #[schema(value_type = String)]
    pub transaction_type: TransactionType,
}

/// Request body for updating a transaction
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTransactionRequest {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500, message = "must be between 1 and 500 characters"))]
    pub description: Option<String>,
    /// `null` clears the category, omitting the field keeps it
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<i32>, nullable)]
    pub category_id: Option<Option<i32>>,
    pub amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub transaction_type: Option<TransactionType>,
}

/// Tells an explicit `null` (`Some(None)`) apart from a missing field (`None`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Filters for listing transactions
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub bank_account_id: Option<i32>,
    pub category_id: Option<i32>,
    /// credit or debit
    #[param(value_type = Option<String>)]
    pub transaction_type: Option<TransactionType>,
    /// Calendar year; combined with `month` selects a single month
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Page size (default 100, max 500)
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub bank_account_id: Option<i32>,
    pub bank_statement_id: Option<i32>,
    pub date: NaiveDate,
    pub description: String,
    pub category_id: Option<i32>,
    /// Signed amount: positive for credits, negative for debits
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub transaction_type: TransactionType,
    /// Account balance right after this transaction was recorded
    pub balance: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            bank_account_id: model.bank_account_id,
            bank_statement_id: model.bank_statement_id,
            date: model.date,
            description: model.description,
            category_id: model.category_id,
            amount: model.amount,
            transaction_type: model.transaction_type,
            balance: model.balance,
            created_at: model.created_at,
        }
    }
}

/// Moves the balance of `account` by `delta` and returns the new balance.
pub(crate) async fn adjust_balance<C: ConnectionTrait>(
    db: &C,
    account: bank_account::Model,
    delta: Decimal,
) -> Result<Decimal, ApiError> {
    let balance = checked_total("balance", account.balance, delta)?;
    debug!(
        "Moving balance of bank account {} by {} to {}",
        account.id, delta, balance
    );
    let mut active: bank_account::ActiveModel = account.into();
    active.balance = Set(balance);
    active.update(db).await?;
    Ok(balance)
}

/// Rejects category ids that do not exist.
pub(crate) async fn ensure_category<C: ConnectionTrait>(
    db: &C,
    category_id: Option<i32>,
) -> Result<(), ApiError> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if category::Entity::find_by_id(id).one(db).await?.is_none() {
        warn!("Unknown category {}", id);
        return Err(ApiError::bad_request(
            "INVALID_CATEGORY",
            format!("Category with id {} does not exist", id),
        ));
    }
    Ok(())
}

async fn find_owned_transaction<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    transaction_id: i32,
) -> Result<transaction::Model, ApiError> {
    transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| {
            warn!("Transaction {} not found", transaction_id);
            ApiError::not_found("Transaction", transaction_id)
        })
}

/// Date bounds selected by the query, if any.
fn date_bounds(
    query: &TransactionQuery,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ApiError> {
    let (mut start, mut end) = (query.start_date, query.end_date);

    match (query.year, query.month) {
        (_, Some(month)) => {
            let period = MonthPeriod::resolve(query.year, Some(month), Utc::now().date_naive())?;
            start = Some(start.map_or(period.start, |s| s.max(period.start)));
            end = Some(end.map_or(period.end, |e| e.min(period.end)));
        }
        (Some(year), None) => {
            let first = MonthPeriod::new(year, 1)?;
            let last = MonthPeriod::new(year, 12)?;
            start = Some(start.map_or(first.start, |s| s.max(first.start)));
            end = Some(end.map_or(last.end, |e| e.min(last.end)));
        }
        (None, None) => {}
    }

    if let (Some(s), Some(e)) = (query.start_date, query.end_date) {
        validate_range(s, e)?;
    }
    Ok((start, end))
}

/// List the caller's transactions
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "List of transactions", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    trace!("Entering get_transactions function");
    let (start, end) = date_bounds(&query)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let mut select = transaction::Entity::find().filter(transaction::Column::UserId.eq(user.id));
    if let Some(account_id) = query.bank_account_id {
        select = select.filter(transaction::Column::BankAccountId.eq(account_id));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(transaction::Column::CategoryId.eq(category_id));
    }
    if let Some(transaction_type) = query.transaction_type {
        select = select.filter(transaction::Column::TransactionType.eq(transaction_type));
    }
    if let Some(start) = start {
        select = select.filter(transaction::Column::Date.gte(start));
    }
    if let Some(end) = end {
        select = select.filter(transaction::Column::Date.lte(end));
    }

    let transactions = select
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(&state.db)
        .await?;

    info!("Retrieved {} transactions", transactions.len());
    let responses = transactions
        .into_iter()
        .map(TransactionResponse::from)
        .collect();
    Ok(Json(ApiResponse::ok(
        responses,
        "Transactions retrieved successfully",
    )))
}

/// Record a transaction and move the account balance
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request, bank account or category", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    trace!("Entering create_transaction function");
    let amount = ensure_non_zero("amount", request.amount)?;
    let signed = request.transaction_type.signed(amount);

    let txn = state.db.begin().await?;

    let account = find_owned_account(&txn, user.id, request.bank_account_id)
        .await?
        .ok_or_else(|| {
            warn!(
                "Transaction rejected, bank account {} not found",
                request.bank_account_id
            );
            ApiError::bad_request(
                "INVALID_BANK_ACCOUNT",
                format!("Bank account with id {} does not exist", request.bank_account_id),
            )
        })?;
    ensure_category(&txn, request.category_id).await?;

    if let Some(statement_id) = request.bank_statement_id {
        let owned = bank_statement::Entity::find_by_id(statement_id)
            .filter(bank_statement::Column::UserId.eq(user.id))
            .one(&txn)
            .await?;
        if owned.is_none() {
            return Err(ApiError::bad_request(
                "INVALID_BANK_STATEMENT",
                format!("Bank statement with id {} does not exist", statement_id),
            ));
        }
    }

    let account_id = account.id;
    let balance = adjust_balance(&txn, account, signed).await?;

    let created = transaction::ActiveModel {
        user_id: Set(user.id),
        bank_account_id: Set(Some(account_id)),
        bank_statement_id: Set(request.bank_statement_id),
        date: Set(request.date),
        description: Set(request.description.trim().to_string()),
        category_id: Set(request.category_id),
        amount: Set(signed),
        transaction_type: Set(request.transaction_type),
        balance: Set(Some(balance)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    invalidate_user(&state.cache, user.id);
    info!("Transaction created with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            TransactionResponse::from(created),
            "Transaction created successfully",
        )),
    ))
}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(transaction_id): Path<i32>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    trace!("Entering get_transaction function");
    let found = find_owned_transaction(&state.db, user.id, transaction_id).await?;
    Ok(Json(ApiResponse::ok(
        TransactionResponse::from(found),
        "Transaction retrieved successfully",
    )))
}

/// Update a transaction and re-balance its account
#[utoipa::path(
    put,
    path = "/api/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn update_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(transaction_id): Path<i32>,
    ApiJson(request): ApiJson<UpdateTransactionRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    trace!("Entering update_transaction function");
    if let Some(amount) = request.amount {
        ensure_non_zero("amount", amount)?;
    }

    let txn = state.db.begin().await?;
    let existing = find_owned_transaction(&txn, user.id, transaction_id).await?;
    ensure_category(&txn, request.category_id.flatten()).await?;

    let transaction_type = request
        .transaction_type
        .unwrap_or(existing.transaction_type);
    let signed = transaction_type.signed(request.amount.unwrap_or(existing.amount));
    let delta = signed - existing.amount;
    let snapshot = match existing.balance {
        Some(balance) if !delta.is_zero() => Some(checked_total("balance", balance, delta)?),
        other => other,
    };

    if !delta.is_zero() {
        if let Some(account_id) = existing.bank_account_id {
            if let Some(account) = find_owned_account(&txn, user.id, account_id).await? {
                adjust_balance(&txn, account, delta).await?;
            }
        }
    }

    let mut active: transaction::ActiveModel = existing.into();
    if let Some(date) = request.date {
        active.date = Set(date);
    }
    if let Some(description) = request.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(category_id) = request.category_id {
        active.category_id = Set(category_id);
    }
    active.amount = Set(signed);
    active.balance = Set(snapshot);
    active.transaction_type = Set(transaction_type);

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    invalidate_user(&state.cache, user.id);
    info!("Transaction {} updated", transaction_id);
    Ok(Json(ApiResponse::ok(
        TransactionResponse::from(updated),
        "Transaction updated successfully",
    )))
}

/// Delete a transaction and revert its effect on the account balance
#[utoipa::path(
    delete,
    path = "/api/transactions/{transaction_id}",
    tag = "transactions",
    params(("transaction_id" = i32, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction deleted", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(transaction_id): Path<i32>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering delete_transaction function");
    let txn = state.db.begin().await?;
    let existing = find_owned_transaction(&txn, user.id, transaction_id).await?;

    if let Some(account_id) = existing.bank_account_id {
        if let Some(account) = find_owned_account(&txn, user.id, account_id).await? {
            adjust_balance(&txn, account, -existing.amount).await?;
        }
    }

    transaction::Entity::delete_by_id(existing.id)
        .exec(&txn)
        .await?;
    txn.commit().await?;

    invalidate_user(&state.cache, user.id);
    info!("Transaction {} deleted", transaction_id);
    Ok(Json(ApiResponse::ok(None, "Transaction deleted successfully")))
}
