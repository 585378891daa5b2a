use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use common::InsightDraft;
use compute::insights::heuristic_insights;
use compute::period::MonthPeriod;
use model::entities::{
    insight::{self, InsightType},
    transaction,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::handlers::analytics::{cached_breakdown, cached_summary, PeriodQuery};
use crate::handlers::notifications::preferences_for;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use crate::services::llm::{build_insights_prompt, parse_insights, INSIGHTS_SYSTEM_PROMPT};

/// Insight response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InsightResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// info, warning or success
    #[schema(value_type = String)]
    pub insight_type: InsightType,
    pub category: Option<String>,
    pub related_transactions: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<insight::Model> for InsightResponse {
    fn from(model: insight::Model) -> Self {
        Self {
            related_transactions: model.related_transaction_ids(),
            id: model.id,
            title: model.title,
            description: model.description,
            insight_type: model.insight_type,
            category: model.category,
            created_at: model.created_at,
        }
    }
}

/// Drafts from the language model, or from the rule-based generator when none is configured.
async fn draft_insights(
    state: &AppState,
    user: &CurrentUser,
    period: &MonthPeriod,
) -> Result<Vec<InsightDraft>, ApiError> {
    let summary = cached_summary(state, user, period).await?;
    let breakdown = cached_breakdown(state, user.id, period).await?;

    if !state.llm.is_configured() {
        debug!("No LLM configured, using heuristic insights");
        return Ok(heuristic_insights(&summary, &breakdown));
    }

    let prompt = build_insights_prompt(&summary, &breakdown, &user.currency);
    let completion = state
        .llm
        .complete(INSIGHTS_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ApiError::Llm(e.to_string()))?;
    parse_insights(&completion).map_err(|e| ApiError::Llm(e.to_string()))
}

/// List the caller's insights, newest first
#[utoipa::path(
    get,
    path = "/api/insights",
    tag = "insights",
    responses(
        (status = 200, description = "List of insights", body = ApiResponse<Vec<InsightResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_insights(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<InsightResponse>>>, ApiError> {
    trace!("Entering get_insights function");
    let insights = insight::Entity::find()
        .filter(insight::Column::UserId.eq(user.id))
        .order_by_desc(insight::Column::CreatedAt)
        .order_by_desc(insight::Column::Id)
        .all(&state.db)
        .await?;

    info!("Retrieved {} insights", insights.len());
    let responses = insights.into_iter().map(InsightResponse::from).collect();
    Ok(Json(ApiResponse::ok(
        responses,
        "Insights retrieved successfully",
    )))
}

/// Generate and store insights for one month
#[utoipa::path(
    post,
    path = "/api/insights/generate",
    tag = "insights",
    params(PeriodQuery),
    responses(
        (status = 201, description = "Insights generated", body = ApiResponse<Vec<InsightResponse>>),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "LLM or database failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn generate_insights(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<InsightResponse>>>), ApiError> {
    trace!("Entering generate_insights function");
    let period = MonthPeriod::resolve(query.year, query.month, Utc::now().date_naive())?;
    let drafts = draft_insights(&state, &user, &period).await?;

    let referenced: Vec<i32> = drafts
        .iter()
        .flat_map(|d| d.related_transactions.iter().copied())
        .collect();
    let owned: HashSet<i32> = if referenced.is_empty() {
        HashSet::new()
    } else {
        transaction::Entity::find()
            .select_only()
            .column(transaction::Column::Id)
            .filter(transaction::Column::UserId.eq(user.id))
            .filter(transaction::Column::Id.is_in(referenced))
            .into_tuple::<i32>()
            .all(&state.db)
            .await?
            .into_iter()
            .collect()
    };

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let mut stored = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        let related: Vec<i32> = draft
            .related_transactions
            .iter()
            .copied()
            .filter(|id| owned.contains(id))
            .collect();

        let created = insight::ActiveModel {
            user_id: Set(user.id),
            title: Set(draft.title.trim().to_string()),
            description: Set(draft.description.trim().to_string()),
            insight_type: Set(InsightType::parse_lenient(&draft.insight_type)),
            category: Set(draft.category.clone()),
            related_transactions: Set(
                (!related.is_empty()).then(|| serde_json::json!(related))
            ),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        stored.push(created);
    }
    txn.commit().await?;
    info!(
        "Stored {} insights for {}-{:02}",
        stored.len(),
        period.year,
        period.month
    );

    if !drafts.is_empty() {
        let preferences = preferences_for(&state.db, user.id).await?;
        if preferences.insight_alerts {
            let label = format!("{}-{:02}", period.year, period.month);
            if let Err(e) = state
                .notifier
                .send_insights_digest(&user, &label, &drafts)
                .await
            {
                warn!("Failed to send insights digest to user {}: {:#}", user.id, e);
            }
        }
    }

    let responses = stored.into_iter().map(InsightResponse::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(responses, "Insights generated successfully")),
    ))
}

/// Delete an insight
#[utoipa::path(
    delete,
    path = "/api/insights/{insight_id}",
    tag = "insights",
    params(("insight_id" = i32, Path, description = "Insight ID")),
    responses(
        (status = 200, description = "Insight deleted", body = ApiResponse<String>),
        (status = 404, description = "Insight not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn delete_insight(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(insight_id): Path<i32>,
) -> Result<Json<ApiResponse<Option<String>>>, ApiError> {
    trace!("Entering delete_insight function");
    let result = insight::Entity::delete_many()
        .filter(insight::Column::Id.eq(insight_id))
        .filter(insight::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Insight", insight_id));
    }

    info!("Insight {} deleted", insight_id);
    Ok(Json(ApiResponse::ok(None, "Insight deleted successfully")))
}
