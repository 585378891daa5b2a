use crate::auth::require_user;
use crate::handlers::{
    admin::{test_db, test_email, test_llm},
    analytics::{get_category_analytics, get_monthly_summary, get_spending_chart},
    auth::{login, logout, me, register},
    bank_accounts::{
        create_bank_account, delete_bank_account, get_bank_account, get_bank_accounts,
        update_bank_account,
    },
    bank_statements::{
        create_bank_statement, delete_bank_statement, get_bank_statement, get_bank_statements,
        import_statement_transactions, set_statement_processed,
    },
    categories::{create_category, get_categories},
    goals::{create_goal, delete_goal, get_goal, get_goals, update_goal, update_goal_progress},
    health::health_check,
    insights::{delete_insight, generate_insights, get_insights},
    notifications::{get_preferences, send_monthly_summary, update_preferences},
    transactions::{
        create_transaction, delete_transaction, get_transaction, get_transactions,
        update_transaction,
    },
    users::{change_password, delete_profile, get_profile, update_profile},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use axum_prometheus::PrometheusMetricLayer;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Routes that require an authenticated user
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Session and profile
        .route("/api/auth/me", get(me))
        .route("/api/users/me", get(get_profile))
        .route("/api/users/me", patch(update_profile))
        .route("/api/users/me", delete(delete_profile))
        .route("/api/users/me/password", put(change_password))
        // Bank accounts
        .route("/api/bank-accounts", get(get_bank_accounts))
        .route("/api/bank-accounts", post(create_bank_account))
        .route("/api/bank-accounts/:account_id", get(get_bank_account))
        .route("/api/bank-accounts/:account_id", put(update_bank_account))
        .route("/api/bank-accounts/:account_id", delete(delete_bank_account))
        // Bank statements
        .route("/api/bank-statements", get(get_bank_statements))
        .route("/api/bank-statements", post(create_bank_statement))
        .route("/api/bank-statements/:statement_id", get(get_bank_statement))
        .route("/api/bank-statements/:statement_id", delete(delete_bank_statement))
        .route(
            "/api/bank-statements/:statement_id/processed",
            patch(set_statement_processed),
        )
        .route(
            "/api/bank-statements/:statement_id/transactions",
            post(import_statement_transactions),
        )
        // Transactions
        .route("/api/transactions", get(get_transactions))
        .route("/api/transactions", post(create_transaction))
        .route("/api/transactions/:transaction_id", get(get_transaction))
        .route("/api/transactions/:transaction_id", put(update_transaction))
        .route("/api/transactions/:transaction_id", delete(delete_transaction))
        // Categories
        .route("/api/categories", get(get_categories))
        .route("/api/categories", post(create_category))
        // Goals
        .route("/api/goals", get(get_goals))
        .route("/api/goals", post(create_goal))
        .route("/api/goals/:goal_id", get(get_goal))
        .route("/api/goals/:goal_id", put(update_goal))
        .route("/api/goals/:goal_id", delete(delete_goal))
        .route("/api/goals/:goal_id/progress", patch(update_goal_progress))
        // Insights
        .route("/api/insights", get(get_insights))
        .route("/api/insights/generate", post(generate_insights))
        .route("/api/insights/:insight_id", delete(delete_insight))
        // Analytics
        .route("/api/analytics/categories", get(get_category_analytics))
        .route("/api/analytics/summary", get(get_monthly_summary))
        .route("/api/analytics/chart", get(get_spending_chart))
        // Notifications
        .route("/api/notifications/preferences", get(get_preferences))
        .route("/api/notifications/preferences", put(update_preferences))
        .route(
            "/api/notifications/monthly-summary",
            post(send_monthly_summary),
        )
        // Admin connectivity checks
        .route("/api/admin/test-email", post(test_email))
        .route("/api/admin/test-llm", post(test_llm))
        .route("/api/admin/test-db", get(test_db))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}

/// Create application router with all routes and middleware
///
/// `with_metrics` installs the global Prometheus recorder and exposes
/// `/metrics`; the recorder can only be installed once per process.
pub fn create_router(state: AppState, with_metrics: bool) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Public auth routes
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(protected_routes(state.clone()))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if with_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
