use axum::{extract::State, response::Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use model::entities::user;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::middleware::removal_cookie;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, CurrentUser};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::helpers::cache::invalidate_user;
use crate::helpers::money::{ensure_non_negative, normalize_currency};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Public view of a user, never includes the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    /// ISO 4217 display currency
    pub currency: String,
    /// Declared monthly salary, used by the monthly summary
    pub monthly_salary: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            currency: model.currency,
            monthly_salary: model.monthly_salary,
            created_at: model.created_at,
        }
    }
}

impl From<CurrentUser> for UserResponse {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            currency: user.currency,
            monthly_salary: user.monthly_salary,
            created_at: user.created_at,
        }
    }
}

/// Partial profile update
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub name: Option<String>,
    pub currency: Option<String>,
    pub monthly_salary: Option<Decimal>,
}

/// Password change
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub new_password: String,
}

async fn load_user(state: &AppState, user_id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::Auth(AuthError::InvalidSession))
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument]
pub async fn get_profile(user: CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(
        UserResponse::from(user),
        "Profile retrieved successfully",
    ))
}

/// Update name, currency or monthly salary
#[utoipa::path(
    patch,
    path = "/api/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_profile function");
    let currency = request
        .currency
        .as_deref()
        .map(normalize_currency)
        .transpose()?;
    let salary = request
        .monthly_salary
        .map(|salary| ensure_non_negative("monthly_salary", salary))
        .transpose()?;

    let existing = load_user(&state, user.id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(name) = request.name {
        debug!("Updating name");
        active.name = Set(name.trim().to_string());
    }
    if let Some(currency) = currency {
        debug!("Updating currency to {}", currency);
        active.currency = Set(currency);
    }
    if let Some(salary) = salary {
        debug!("Updating monthly salary");
        active.monthly_salary = Set(Some(salary));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    invalidate_user(&state.cache, user.id);

    info!("Profile updated for user {}", user.id);
    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated),
        "Profile updated successfully",
    )))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/users/me/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<String>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Wrong current password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering change_password function");
    let existing = load_user(&state, user.id).await?;

    if !verify_password(&existing.password_hash, &request.current_password).await? {
        warn!("Password change rejected for user {}", user.id);
        return Err(ApiError::Unauthorized {
            code: "INVALID_CREDENTIALS",
            message: "Current password is incorrect".to_string(),
        });
    }

    let password_hash = hash_password(&request.new_password).await?;
    let mut active: user::ActiveModel = existing.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    info!("Password changed for user {}", user.id);
    Ok(Json(ApiResponse::ok(None, "Password changed successfully")))
}

/// Delete the caller and everything they own
#[utoipa::path(
    delete,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, jar), fields(user_id = user.id))]
pub async fn delete_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> Result<(CookieJar, Json<ApiResponse<Option<String>>>), ApiError> {
    trace!("Entering delete_profile function");
    let result = user::Entity::delete_by_id(user.id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::Auth(AuthError::InvalidSession));
    }

    invalidate_user(&state.cache, user.id);
    info!("Deleted user {}", user.id);
    Ok((
        jar.remove(removal_cookie()),
        Json(ApiResponse::ok(None, "Account deleted successfully")),
    ))
}
