use std::time::Instant;

use axum::{extract::State, response::Json};
use model::entities::{bank_account, category, goal, insight, transaction, user};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Recipient of the test email; defaults to the caller
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct TestEmailRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct TestLlmRequest {
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestLlmResponse {
    pub model: String,
    pub completion: String,
    pub elapsed_ms: u64,
}

/// Database reachability and table sizes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub backend: String,
    pub users: u64,
    pub bank_accounts: u64,
    pub transactions: u64,
    pub categories: u64,
    pub goals: u64,
    pub insights: u64,
}

/// Send a test email
#[utoipa::path(
    post,
    path = "/api/admin/test-email",
    tag = "admin",
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Email sent", body = ApiResponse<String>),
        (status = 400, description = "Invalid recipient", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn test_email(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<TestEmailRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering test_email function");
    let to = request.to.unwrap_or(user.email);

    state.notifier.send_test(&to).await.map_err(|e| {
        error!("Test email to {} failed: {:#}", to, e);
        ApiError::Email(format!("{:#}", e))
    })?;

    info!("Test email sent to {} via {}", to, state.notifier.transport());
    Ok(Json(ApiResponse::ok(
        to,
        format!("Test email sent via {}", state.notifier.transport()),
    )))
}

/// Send a raw prompt to the language model
#[utoipa::path(
    post,
    path = "/api/admin/test-llm",
    tag = "admin",
    request_body = TestLlmRequest,
    responses(
        (status = 200, description = "Completion", body = ApiResponse<TestLlmResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "LLM request failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn test_llm(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<TestLlmRequest>,
) -> Result<Json<ApiResponse<TestLlmResponse>>, ApiError> {
    trace!("Entering test_llm function");
    let started = Instant::now();
    let completion = state
        .llm
        .complete("You are a helpful assistant.", &request.prompt)
        .await
        .map_err(|e| {
            error!("Test LLM request failed: {}", e);
            ApiError::Llm(e.to_string())
        })?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!("LLM answered in {} ms", elapsed_ms);
    Ok(Json(ApiResponse::ok(
        TestLlmResponse {
            model: state.llm.model().to_string(),
            completion,
            elapsed_ms,
        },
        "LLM request succeeded",
    )))
}

/// Check the database connection
#[utoipa::path(
    get,
    path = "/api/admin/test-db",
    tag = "admin",
    responses(
        (status = 200, description = "Database reachable", body = ApiResponse<DatabaseStatus>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Database unreachable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn test_db(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<DatabaseStatus>>, ApiError> {
    trace!("Entering test_db function");
    state.db.ping().await?;

    let status = DatabaseStatus {
        connected: true,
        backend: format!("{:?}", state.db.get_database_backend()),
        users: user::Entity::find().count(&state.db).await?,
        bank_accounts: bank_account::Entity::find().count(&state.db).await?,
        transactions: transaction::Entity::find().count(&state.db).await?,
        categories: category::Entity::find().count(&state.db).await?,
        goals: goal::Entity::find().count(&state.db).await?,
        insights: insight::Entity::find().count(&state.db).await?,
    };

    info!("Database reachable ({})", status.backend);
    Ok(Json(ApiResponse::ok(status, "Database connection is healthy")))
}
