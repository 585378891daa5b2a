use axum::{extract::State, response::Json};
use chrono::{NaiveDate, Utc};
use common::{CategoryBreakdown, ChartInterval, MonthlySummary, SpendingChart};
use compute::period::MonthPeriod;
use serde::Deserialize;
use tracing::{debug, info, instrument, trace};
use utoipa::IntoParams;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::helpers::cache::cache_key;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};

/// Month selector, defaulting to the current month
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    /// 1 to 12
    pub month: Option<u32>,
}

/// Chart range and bucket size
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// daily, weekly or monthly (default: monthly)
    #[param(value_type = Option<String>)]
    pub interval: Option<ChartInterval>,
    /// Inclusive start (default: first day of the current month)
    pub start_date: Option<NaiveDate>,
    /// Inclusive end (default: last day of the current month)
    pub end_date: Option<NaiveDate>,
}

fn interval_name(interval: ChartInterval) -> &'static str {
    match interval {
        ChartInterval::Daily => "daily",
        ChartInterval::Weekly => "weekly",
        ChartInterval::Monthly => "monthly",
    }
}

pub(crate) async fn cached_breakdown(
    state: &AppState,
    user_id: i32,
    period: &MonthPeriod,
) -> Result<CategoryBreakdown, ApiError> {
    let key = cache_key(
        user_id,
        "categories",
        &format!("{}-{:02}", period.year, period.month),
    );
    if let Some(CachedData::Categories(breakdown)) = state.cache.get(&key).await {
        debug!("Category breakdown served from cache: {}", key);
        return Ok(breakdown);
    }

    let breakdown = compute::category_breakdown(&state.db, user_id, *period).await?;
    state
        .cache
        .insert(key, CachedData::Categories(breakdown.clone()))
        .await;
    Ok(breakdown)
}

pub(crate) async fn cached_summary(
    state: &AppState,
    user: &CurrentUser,
    period: &MonthPeriod,
) -> Result<MonthlySummary, ApiError> {
    let key = cache_key(
        user.id,
        "summary",
        &format!("{}-{:02}", period.year, period.month),
    );
    if let Some(CachedData::Summary(summary)) = state.cache.get(&key).await {
        debug!("Monthly summary served from cache: {}", key);
        return Ok(summary);
    }

    let summary =
        compute::monthly_summary(&state.db, user.id, *period, user.monthly_salary).await?;
    state
        .cache
        .insert(key, CachedData::Summary(summary.clone()))
        .await;
    Ok(summary)
}

async fn cached_chart(
    state: &AppState,
    user_id: i32,
    interval: ChartInterval,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SpendingChart, ApiError> {
    let key = cache_key(
        user_id,
        "chart",
        &format!("{}:{}:{}", interval_name(interval), start, end),
    );
    if let Some(CachedData::Chart(chart)) = state.cache.get(&key).await {
        debug!("Spending chart served from cache: {}", key);
        return Ok(chart);
    }

    let chart = compute::spending_chart(&state.db, user_id, interval, start, end).await?;
    state.cache.insert(key, CachedData::Chart(chart.clone())).await;
    Ok(chart)
}

/// Spending per category for one month
#[utoipa::path(
    get,
    path = "/api/analytics/categories",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Category breakdown", body = ApiResponse<CategoryBreakdown>),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_category_analytics(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<Json<ApiResponse<CategoryBreakdown>>, ApiError> {
    trace!("Entering get_category_analytics function");
    let period = MonthPeriod::resolve(query.year, query.month, Utc::now().date_naive())?;
    let breakdown = cached_breakdown(&state, user.id, &period).await?;

    info!(
        "Category breakdown for {}-{:02}: {} categories",
        period.year,
        period.month,
        breakdown.categories.len()
    );
    Ok(Json(ApiResponse::ok(
        breakdown,
        "Category analytics retrieved successfully",
    )))
}

/// Income, expenses and savings rate for one month
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "analytics",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Monthly summary", body = ApiResponse<MonthlySummary>),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_monthly_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> Result<Json<ApiResponse<MonthlySummary>>, ApiError> {
    trace!("Entering get_monthly_summary function");
    let period = MonthPeriod::resolve(query.year, query.month, Utc::now().date_naive())?;
    let summary = cached_summary(&state, &user, &period).await?;

    info!(
        "Monthly summary for {}-{:02}: {} transactions",
        period.year, period.month, summary.transaction_count
    );
    Ok(Json(ApiResponse::ok(
        summary,
        "Monthly summary retrieved successfully",
    )))
}

/// Income and expenses bucketed over a date range
#[utoipa::path(
    get,
    path = "/api/analytics/chart",
    tag = "analytics",
    params(ChartQuery),
    responses(
        (status = 200, description = "Spending chart", body = ApiResponse<SpendingChart>),
        (status = 400, description = "Invalid or too large range", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_spending_chart(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ChartQuery>,
) -> Result<Json<ApiResponse<SpendingChart>>, ApiError> {
    trace!("Entering get_spending_chart function");
    let current = MonthPeriod::resolve(None, None, Utc::now().date_naive())?;
    let interval = query.interval.unwrap_or_default();
    let start = query.start_date.unwrap_or(current.start);
    let end = query.end_date.unwrap_or(current.end);
    debug!("Chart range {} to {} ({:?})", start, end, interval);

    let chart = cached_chart(&state, user.id, interval, start, end).await?;
    info!("Spending chart with {} points", chart.points.len());
    Ok(Json(ApiResponse::ok(
        chart,
        "Spending chart retrieved successfully",
    )))
}
