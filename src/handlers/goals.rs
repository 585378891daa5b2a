use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use model::entities::goal::{self, GoalStatus};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::notifications::preferences_for;
use crate::helpers::money::{checked_total, ensure_non_negative, ensure_positive};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for creating a savings goal
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,
    /// Must be greater than zero
    pub target_amount: Decimal,
    /// Amount already saved (default: 0)
    pub current_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
    /// Set when the goal was suggested by generated insights
    pub is_ai_generated: Option<bool>,
}

/// Request body for updating a savings goal
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,
    pub target_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
    /// active, completed or cancelled
    #[schema(value_type = Option<String>)]
    pub status: Option<GoalStatus>,
}

/// Either an absolute `current_amount` or a delta `amount`
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct GoalProgressRequest {
    pub current_amount: Option<Decimal>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GoalQuery {
    /// Only goals in this status
    #[param(value_type = Option<String>)]
    pub status: Option<GoalStatus>,
}

/// Goal response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoalResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    /// current / target x 100, clamped to [0, 100]
    pub progress_percentage: f64,
    pub remaining_amount: Decimal,
    pub deadline: Option<NaiveDate>,
    pub is_ai_generated: bool,
    #[schema(value_type = String)]
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<goal::Model> for GoalResponse {
    fn from(model: goal::Model) -> Self {
        Self {
            id: model.id,
            progress_percentage: model.progress_percentage(),
            remaining_amount: model.remaining_amount(),
            name: model.name,
            description: model.description,
            target_amount: model.target_amount,
            current_amount: model.current_amount,
            deadline: model.deadline,
            is_ai_generated: model.is_ai_generated,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// The saved amount after applying a progress request to `current`.
fn next_amount(current: Decimal, request: &GoalProgressRequest) -> Result<Decimal, ApiError> {
    let next = match (request.current_amount, request.amount) {
        (Some(absolute), None) => absolute,
        (None, Some(delta)) => checked_total("current_amount", current, delta)?,
        _ => {
            return Err(ApiError::Validation(
                "Provide exactly one of current_amount or amount".to_string(),
            ))
        }
    };
    ensure_non_negative("current_amount", next)
}

async fn find_owned_goal(
    state: &AppState,
    user_id: i32,
    goal_id: i32,
) -> Result<goal::Model, ApiError> {
    goal::Entity::find_by_id(goal_id)
        .filter(goal::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Goal {} not found", goal_id);
            ApiError::not_found("Goal", goal_id)
        })
}

/// List the caller's goals
#[utoipa::path(
    get,
    path = "/api/goals",
    tag = "goals",
    params(GoalQuery),
    responses(
        (status = 200, description = "List of goals", body = ApiResponse<Vec<GoalResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_goals(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<GoalQuery>,
) -> Result<Json<ApiResponse<Vec<GoalResponse>>>, ApiError> {
    trace!("Entering get_goals function");
    let mut select = goal::Entity::find().filter(goal::Column::UserId.eq(user.id));
    if let Some(status) = query.status {
        select = select.filter(goal::Column::Status.eq(status));
    }

    let goals = select
        .order_by_desc(goal::Column::CreatedAt)
        .order_by_desc(goal::Column::Id)
        .all(&state.db)
        .await?;

    info!("Retrieved {} goals", goals.len());
    let responses = goals.into_iter().map(GoalResponse::from).collect();
    Ok(Json(ApiResponse::ok(responses, "Goals retrieved successfully")))
}

/// Create a savings goal
#[utoipa::path(
    post,
    path = "/api/goals",
    tag = "goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn create_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateGoalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GoalResponse>>), ApiError> {
    trace!("Entering create_goal function");
    let target = ensure_positive("target_amount", request.target_amount)?;
    let current =
        ensure_non_negative("current_amount", request.current_amount.unwrap_or_default())?;
    let status = if current >= target {
        GoalStatus::Completed
    } else {
        GoalStatus::Active
    };

    let now = Utc::now();
    let created = goal::ActiveModel {
        user_id: Set(user.id),
        name: Set(request.name.trim().to_string()),
        description: Set(request.description),
        target_amount: Set(target),
        current_amount: Set(current),
        deadline: Set(request.deadline),
        is_ai_generated: Set(request.is_ai_generated.unwrap_or(false)),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Goal created with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            GoalResponse::from(created),
            "Goal created successfully",
        )),
    ))
}

/// Get a goal by ID
#[utoipa::path(
    get,
    path = "/api/goals/{goal_id}",
    tag = "goals",
    params(("goal_id" = i32, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Goal", body = ApiResponse<GoalResponse>),
        (status = 404, description = "Goal not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    trace!("Entering get_goal function");
    let found = find_owned_goal(&state, user.id, goal_id).await?;
    Ok(Json(ApiResponse::ok(
        GoalResponse::from(found),
        "Goal retrieved successfully",
    )))
}

/// Update a goal
#[utoipa::path(
    put,
    path = "/api/goals/{goal_id}",
    tag = "goals",
    params(("goal_id" = i32, Path, description = "Goal ID")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn update_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
    ApiJson(request): ApiJson<UpdateGoalRequest>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    trace!("Entering update_goal function");
    let target = request
        .target_amount
        .map(|target| ensure_positive("target_amount", target))
        .transpose()?;
    let existing = find_owned_goal(&state, user.id, goal_id).await?;
    let (current_amount, status) = (existing.current_amount, existing.status);

    let mut active: goal::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(target) = target {
        active.target_amount = Set(target);
    }
    if let Some(deadline) = request.deadline {
        active.deadline = Set(Some(deadline));
    }
    if let Some(status) = request.status {
        debug!("Goal {} status set to {:?}", goal_id, status);
        active.status = Set(status);
    } else if target.is_some_and(|target| current_amount >= target)
        && status == GoalStatus::Active
    {
        debug!("Goal {} target lowered to its saved amount", goal_id);
        active.status = Set(GoalStatus::Completed);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    info!("Goal {} updated", goal_id);
    Ok(Json(ApiResponse::ok(
        GoalResponse::from(updated),
        "Goal updated successfully",
    )))
}

/// Delete a goal
#[utoipa::path(
    delete,
    path = "/api/goals/{goal_id}",
    tag = "goals",
    params(("goal_id" = i32, Path, description = "Goal ID")),
    responses(
        (status = 200, description = "Goal deleted", body = ApiResponse<String>),
        (status = 404, description = "Goal not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn delete_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering delete_goal function");
    let result = goal::Entity::delete_many()
        .filter(goal::Column::Id.eq(goal_id))
        .filter(goal::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Goal", goal_id));
    }

    info!("Goal {} deleted", goal_id);
    Ok(Json(ApiResponse::ok(None, "Goal deleted successfully")))
}

/// Record progress towards a goal
#[utoipa::path(
    patch,
    path = "/api/goals/{goal_id}/progress",
    tag = "goals",
    params(("goal_id" = i32, Path, description = "Goal ID")),
    request_body = GoalProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse),
        (status = 409, description = "Goal is not active", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn update_goal_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(goal_id): Path<i32>,
    ApiJson(request): ApiJson<GoalProgressRequest>,
) -> Result<Json<ApiResponse<GoalResponse>>, ApiError> {
    trace!("Entering update_goal_progress function");
    let existing = find_owned_goal(&state, user.id, goal_id).await?;

    if existing.status != GoalStatus::Active {
        warn!("Progress rejected, goal {} is {:?}", goal_id, existing.status);
        return Err(ApiError::conflict(
            "GOAL_NOT_ACTIVE",
            format!("Goal {} is not active", goal_id),
        ));
    }

    let current = next_amount(existing.current_amount, &request)?;
    let reached = current >= existing.target_amount;

    let mut active: goal::ActiveModel = existing.into();
    active.current_amount = Set(current);
    if reached {
        active.status = Set(GoalStatus::Completed);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    if reached {
        info!("Goal {} completed", goal_id);
        let preferences = preferences_for(&state.db, user.id).await?;
        if preferences.goal_updates {
            if let Err(e) = state.notifier.send_goal_completed(&user, &updated).await {
                warn!("Failed to send goal completion email for goal {}: {:#}", goal_id, e);
            }
        }
    } else {
        debug!(
            "Goal {} at {:.2}%",
            goal_id,
            updated.progress_percentage()
        );
    }

    Ok(Json(ApiResponse::ok(
        GoalResponse::from(updated),
        "Goal progress updated successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(current_amount: Option<i64>, amount: Option<i64>) -> GoalProgressRequest {
        GoalProgressRequest {
            current_amount: current_amount.map(|v| Decimal::new(v, 0)),
            amount: amount.map(|v| Decimal::new(v, 0)),
        }
    }

    #[test]
    fn test_next_amount() {
        let current = Decimal::new(100, 0);
        assert_eq!(
            next_amount(current, &progress(Some(250), None)).unwrap(),
            Decimal::new(250, 0)
        );
        assert_eq!(
            next_amount(current, &progress(None, Some(-40))).unwrap(),
            Decimal::new(60, 0)
        );
    }

    #[test]
    fn test_next_amount_rejects_bad_requests() {
        let current = Decimal::new(100, 0);
        assert!(next_amount(current, &progress(None, None)).is_err());
        assert!(next_amount(current, &progress(Some(1), Some(1))).is_err());
        assert!(next_amount(current, &progress(None, Some(-101))).is_err());
    }
}
