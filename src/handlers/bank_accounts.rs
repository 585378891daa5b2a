use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::bank_account::{self, AccountType};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::helpers::cache::invalidate_user;
use crate::helpers::money::ensure_storable;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Colour given to accounts created without one
pub const DEFAULT_ACCOUNT_COLOR: &str = "#4F46E5";

/// Request body for creating a bank account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBankAccountRequest {
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub name: String,
    /// checking, savings, credit, investment or other (default: checking)
    #[schema(value_type = Option<String>)]
    pub account_type: Option<AccountType>,
    #[validate(length(max = 34, message = "must be at most 34 characters"))]
    pub account_number: Option<String>,
    /// Opening balance (default: 0)
    pub balance: Option<Decimal>,
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 10, message = "must be between 1 and 10 characters"))]
    pub short_code: Option<String>,
}

/// Request body for updating a bank account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateBankAccountRequest {
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub account_type: Option<AccountType>,
    #[validate(length(max = 34, message = "must be at most 34 characters"))]
    pub account_number: Option<String>,
    /// Manual balance correction
    pub balance: Option<Decimal>,
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 10, message = "must be between 1 and 10 characters"))]
    pub short_code: Option<String>,
}

/// Bank account response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BankAccountResponse {
    pub id: i32,
    pub name: String,
    #[schema(value_type = String)]
    pub account_type: AccountType,
    pub account_number: String,
    pub balance: Decimal,
    pub color: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<bank_account::Model> for BankAccountResponse {
    fn from(model: bank_account::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            account_type: model.account_type,
            account_number: model.account_number,
            balance: model.balance,
            color: model.color,
            short_code: model.short_code,
            created_at: model.created_at,
        }
    }
}

/// Loads an account of `user_id`; accounts of other users are reported as missing.
pub(crate) async fn find_owned_account<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    account_id: i32,
) -> Result<Option<bank_account::Model>, ApiError> {
    Ok(bank_account::Entity::find_by_id(account_id)
        .filter(bank_account::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Get all bank accounts of the caller
#[utoipa::path(
    get,
    path = "/api/bank-accounts",
    tag = "bank-accounts",
    responses(
        (status = 200, description = "List of bank accounts", body = ApiResponse<Vec<BankAccountResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_bank_accounts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<BankAccountResponse>>>, ApiError> {
    trace!("Entering get_bank_accounts function");
    let accounts = bank_account::Entity::find()
        .filter(bank_account::Column::UserId.eq(user.id))
        .order_by_asc(bank_account::Column::Id)
        .all(&state.db)
        .await?;

    info!("Retrieved {} bank accounts", accounts.len());
    let responses = accounts.into_iter().map(BankAccountResponse::from).collect();
    Ok(Json(ApiResponse::ok(
        responses,
        "Bank accounts retrieved successfully",
    )))
}

/// Create a bank account
#[utoipa::path(
    post,
    path = "/api/bank-accounts",
    tag = "bank-accounts",
    request_body = CreateBankAccountRequest,
    responses(
        (status = 201, description = "Bank account created", body = ApiResponse<BankAccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn create_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateBankAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BankAccountResponse>>), ApiError> {
    trace!("Entering create_bank_account function");
    let balance = ensure_storable("balance", request.balance.unwrap_or(Decimal::ZERO))?;
    let name = request.name.trim().to_string();
    let short_code = request
        .short_code
        .map(|code| code.trim().to_uppercase())
        .unwrap_or_else(|| bank_account::Model::default_short_code(&name));
    debug!("Creating bank account '{}' ({})", name, short_code);

    let account = bank_account::ActiveModel {
        user_id: Set(user.id),
        name: Set(name),
        account_type: Set(request.account_type.unwrap_or(AccountType::Checking)),
        account_number: Set(request.account_number.unwrap_or_default()),
        balance: Set(balance),
        color: Set(request
            .color
            .unwrap_or_else(|| DEFAULT_ACCOUNT_COLOR.to_string())),
        short_code: Set(short_code),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Bank account created with ID: {}", account.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            BankAccountResponse::from(account),
            "Bank account created successfully",
        )),
    ))
}

/// Get a bank account by ID
#[utoipa::path(
    get,
    path = "/api/bank-accounts/{account_id}",
    tag = "bank-accounts",
    params(("account_id" = i32, Path, description = "Bank account ID")),
    responses(
        (status = 200, description = "Bank account", body = ApiResponse<BankAccountResponse>),
        (status = 404, description = "Bank account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<i32>,
) -> Result<Json<ApiResponse<BankAccountResponse>>, ApiError> {
    trace!("Entering get_bank_account function");
    let account = find_owned_account(&state.db, user.id, account_id)
        .await?
        .ok_or_else(|| {
            warn!("Bank account {} not found", account_id);
            ApiError::not_found("Bank account", account_id)
        })?;

    Ok(Json(ApiResponse::ok(
        BankAccountResponse::from(account),
        "Bank account retrieved successfully",
    )))
}

/// Update a bank account
#[utoipa::path(
    put,
    path = "/api/bank-accounts/{account_id}",
    tag = "bank-accounts",
    params(("account_id" = i32, Path, description = "Bank account ID")),
    request_body = UpdateBankAccountRequest,
    responses(
        (status = 200, description = "Bank account updated", body = ApiResponse<BankAccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Bank account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn update_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<i32>,
    ApiJson(request): ApiJson<UpdateBankAccountRequest>,
) -> Result<Json<ApiResponse<BankAccountResponse>>, ApiError> {
    trace!("Entering update_bank_account function");
    let account = find_owned_account(&state.db, user.id, account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bank account", account_id))?;

    let mut active: bank_account::ActiveModel = account.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(account_type) = request.account_type {
        active.account_type = Set(account_type);
    }
    if let Some(account_number) = request.account_number {
        active.account_number = Set(account_number);
    }
    if let Some(balance) = request.balance {
        let balance = ensure_storable("balance", balance)?;
        debug!("Correcting balance of bank account {}", account_id);
        active.balance = Set(balance);
    }
    if let Some(color) = request.color {
        active.color = Set(color);
    }
    if let Some(short_code) = request.short_code {
        active.short_code = Set(short_code.trim().to_uppercase());
    }

    let updated = active.update(&state.db).await?;
    info!("Bank account {} updated", account_id);
    Ok(Json(ApiResponse::ok(
        BankAccountResponse::from(updated),
        "Bank account updated successfully",
    )))
}

/// Delete a bank account and its transactions
#[utoipa::path(
    delete,
    path = "/api/bank-accounts/{account_id}",
    tag = "bank-accounts",
    params(("account_id" = i32, Path, description = "Bank account ID")),
    responses(
        (status = 200, description = "Bank account deleted", body = ApiResponse<String>),
        (status = 404, description = "Bank account not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn delete_bank_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(account_id): Path<i32>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering delete_bank_account function");
    let result = bank_account::Entity::delete_many()
        .filter(bank_account::Column::Id.eq(account_id))
        .filter(bank_account::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        warn!("Bank account {} not found for deletion", account_id);
        return Err(ApiError::not_found("Bank account", account_id));
    }

    invalidate_user(&state.cache, user.id);
    info!("Bank account {} deleted", account_id);
    Ok(Json(ApiResponse::ok(None, "Bank account deleted successfully")))
}
