use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use model::entities::{notification_preference, user};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::middleware::{removal_cookie, session_cookie};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::handlers::users::UserResponse;
use crate::helpers::money::normalize_currency;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub name: String,
    /// ISO 4217 display currency (default: USD)
    pub currency: Option<String>,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Issued session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Trims the address and lower-cases its domain part.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: &user::Model,
) -> Result<(CookieJar, AuthResponse), ApiError> {
    let token = state.tokens.issue(user.id)?;
    let expires_in = state.tokens.expires_in();
    let jar = jar.add(session_cookie(token.clone(), expires_in, state.cookie_secure));

    Ok((
        jar,
        AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: UserResponse::from(user.clone()),
        },
    ))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, jar, request))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<AuthResponse>>), ApiError> {
    trace!("Entering register function");
    let email = normalize_email(&request.email);
    let currency = normalize_currency(request.currency.as_deref().unwrap_or("USD"))?;
    debug!("Registering user with email: {}", email);

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        warn!("Registration rejected, email already registered: {}", email);
        return Err(ApiError::conflict(
            "EMAIL_ALREADY_REGISTERED",
            "An account with this email already exists",
        ));
    }

    let password_hash = hash_password(&request.password).await?;
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let new_user = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        name: Set(request.name.trim().to_string()),
        currency: Set(currency),
        monthly_salary: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    notification_preference::ActiveModel {
        user_id: Set(new_user.id),
        monthly_summary: Set(true),
        goal_updates: Set(true),
        insight_alerts: Set(true),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("User registered with ID: {}", new_user.id);

    let current = CurrentUser::from(new_user.clone());
    if let Err(e) = state.notifier.send_welcome(&current).await {
        warn!("Failed to send welcome email to user {}: {:#}", new_user.id, e);
    }

    let (jar, session) = issue_session(&state, jar, &new_user)?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::ok(session, "User registered successfully")),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, jar, request))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<AuthResponse>>), ApiError> {
    trace!("Entering login function");
    let email = normalize_email(&request.email);
    let invalid = || ApiError::Unauthorized {
        code: "INVALID_CREDENTIALS",
        message: "Invalid email or password".to_string(),
    };

    let Some(found) = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
    else {
        warn!("Login failed, unknown email: {}", email);
        return Err(invalid());
    };

    if !verify_password(&found.password_hash, &request.password).await? {
        warn!("Login failed, wrong password for user {}", found.id);
        return Err(invalid());
    }

    info!("User {} logged in", found.id);
    let (jar, session) = issue_session(&state, jar, &found)?;
    Ok((jar, Json(ApiResponse::ok(session, "Logged in successfully"))))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>)
    )
)]
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<Option<String>>>) {
    debug!("Clearing session cookie");
    (
        jar.remove(removal_cookie()),
        Json(ApiResponse::ok(None, "Logged out successfully")),
    )
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument]
pub async fn me(user: CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(
        UserResponse::from(user),
        "User retrieved successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "Ada@example.com");
        assert_eq!(normalize_email("ada@example.com"), "ada@example.com");
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }
}
