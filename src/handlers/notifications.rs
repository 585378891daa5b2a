use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use compute::period::MonthPeriod;
use model::entities::notification_preference;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::analytics::{cached_breakdown, cached_summary, PeriodQuery};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Email toggles of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreferencesResponse {
    pub monthly_summary: bool,
    pub goal_updates: bool,
    pub insight_alerts: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<notification_preference::Model> for PreferencesResponse {
    fn from(model: notification_preference::Model) -> Self {
        Self {
            monthly_summary: model.monthly_summary,
            goal_updates: model.goal_updates,
            insight_alerts: model.insight_alerts,
            updated_at: model.updated_at,
        }
    }
}

/// Toggles to change; omitted fields keep their value
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdatePreferencesRequest {
    pub monthly_summary: Option<bool>,
    pub goal_updates: Option<bool>,
    pub insight_alerts: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlySummaryEmailResult {
    /// False when the caller has monthly summaries switched off
    pub sent: bool,
    pub year: i32,
    pub month: u32,
    pub to: String,
}

/// Preferences of `user_id`, created with every toggle on when missing.
pub(crate) async fn preferences_for<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<notification_preference::Model, ApiError> {
    let existing = notification_preference::Entity::find()
        .filter(notification_preference::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if let Some(preferences) = existing {
        return Ok(preferences);
    }

    debug!("Creating default notification preferences for user {}", user_id);
    let created = notification_preference::ActiveModel {
        user_id: Set(user_id),
        monthly_summary: Set(true),
        goal_updates: Set(true),
        insight_alerts: Set(true),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// Get the caller's notification preferences
#[utoipa::path(
    get,
    path = "/api/notifications/preferences",
    tag = "notifications",
    responses(
        (status = 200, description = "Notification preferences", body = ApiResponse<PreferencesResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_preferences(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<PreferencesResponse>>, ApiError> {
    trace!("Entering get_preferences function");
    let preferences = preferences_for(&state.db, user.id).await?;
    Ok(Json(ApiResponse::ok(
        PreferencesResponse::from(preferences),
        "Notification preferences retrieved successfully",
    )))
}

/// Update the caller's notification preferences
#[utoipa::path(
    put,
    path = "/api/notifications/preferences",
    tag = "notifications",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Notification preferences updated", body = ApiResponse<PreferencesResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn update_preferences(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<PreferencesResponse>>, ApiError> {
    trace!("Entering update_preferences function");
    let preferences = preferences_for(&state.db, user.id).await?;

    let mut active: notification_preference::ActiveModel = preferences.into();
    if let Some(monthly_summary) = request.monthly_summary {
        active.monthly_summary = Set(monthly_summary);
    }
    if let Some(goal_updates) = request.goal_updates {
        active.goal_updates = Set(goal_updates);
    }
    if let Some(insight_alerts) = request.insight_alerts {
        active.insight_alerts = Set(insight_alerts);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    info!("Notification preferences updated for user {}", user.id);
    Ok(Json(ApiResponse::ok(
        PreferencesResponse::from(updated),
        "Notification preferences updated successfully",
    )))
}

/// Email the caller a summary of one month
#[utoipa::path(
    post,
    path = "/api/notifications/monthly-summary",
    tag = "notifications",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Summary sent or skipped", body = ApiResponse<MonthlySummaryEmailResult>),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn send_monthly_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<Json<ApiResponse<MonthlySummaryEmailResult>>, ApiError> {
    trace!("Entering send_monthly_summary function");
    let period = MonthPeriod::resolve(query.year, query.month, Utc::now().date_naive())?;
    let preferences = preferences_for(&state.db, user.id).await?;

    let mut result = MonthlySummaryEmailResult {
        sent: false,
        year: period.year,
        month: period.month,
        to: user.email.clone(),
    };

    if !preferences.monthly_summary {
        info!("Monthly summary emails are off for user {}", user.id);
        return Ok(Json(ApiResponse::ok(
            result,
            "Monthly summary emails are disabled",
        )));
    }

    let summary = cached_summary(&state, &user, &period).await?;
    let breakdown = cached_breakdown(&state, user.id, &period).await?;
    state
        .notifier
        .send_monthly_summary(&user, &summary, &breakdown)
        .await
        .map_err(|e| ApiError::Email(format!("{:#}", e)))?;

    result.sent = true;
    info!(
        "Monthly summary for {}-{:02} sent to user {}",
        period.year, period.month, user.id
    );
    Ok(Json(ApiResponse::ok(result, "Monthly summary sent")))
}
