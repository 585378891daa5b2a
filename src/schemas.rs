use std::sync::Arc;

use common::{CategoryBreakdown, MonthlySummary, SpendingChart};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::auth::TokenService;
use crate::helpers::cache::AnalyticsCache;
use crate::services::email::Notifier;
use crate::services::llm::LlmClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Per-user analytics results
    pub cache: AnalyticsCache,
    /// Session token signing and verification
    pub tokens: Arc<TokenService>,
    /// Templated email delivery
    pub notifier: Arc<Notifier>,
    /// Chat-completion backend for insights
    pub llm: Arc<dyn LlmClient>,
    /// Whether the session cookie is marked `Secure`
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .field("notifier", &self.notifier)
            .field("llm", &self.llm.model())
            .finish_non_exhaustive()
    }
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Categories(CategoryBreakdown),
    Summary(MonthlySummary),
    Chart(SpendingChart),
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Registers the bearer and cookie security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::users::get_profile,
        crate::handlers::users::update_profile,
        crate::handlers::users::change_password,
        crate::handlers::users::delete_profile,
        crate::handlers::bank_accounts::get_bank_accounts,
        crate::handlers::bank_accounts::create_bank_account,
        crate::handlers::bank_accounts::get_bank_account,
        crate::handlers::bank_accounts::update_bank_account,
        crate::handlers::bank_accounts::delete_bank_account,
        crate::handlers::bank_statements::get_bank_statements,
        crate::handlers::bank_statements::create_bank_statement,
        crate::handlers::bank_statements::get_bank_statement,
        crate::handlers::bank_statements::delete_bank_statement,
        crate::handlers::bank_statements::set_statement_processed,
        crate::handlers::bank_statements::import_statement_transactions,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::create_category,
        crate::handlers::goals::get_goals,
        crate::handlers::goals::create_goal,
        crate::handlers::goals::get_goal,
        crate::handlers::goals::update_goal,
        crate::handlers::goals::delete_goal,
        crate::handlers::goals::update_goal_progress,
        crate::handlers::insights::get_insights,
        crate::handlers::insights::generate_insights,
        crate::handlers::insights::delete_insight,
        crate::handlers::analytics::get_category_analytics,
        crate::handlers::analytics::get_monthly_summary,
        crate::handlers::analytics::get_spending_chart,
        crate::handlers::notifications::get_preferences,
        crate::handlers::notifications::update_preferences,
        crate::handlers::notifications::send_monthly_summary,
        crate::handlers::admin::test_email,
        crate::handlers::admin::test_llm,
        crate::handlers::admin::test_db,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::UpdateProfileRequest,
            crate::handlers::users::ChangePasswordRequest,
            crate::handlers::bank_accounts::CreateBankAccountRequest,
            crate::handlers::bank_accounts::UpdateBankAccountRequest,
            crate::handlers::bank_accounts::BankAccountResponse,
            crate::handlers::bank_statements::CreateBankStatementRequest,
            crate::handlers::bank_statements::SetProcessedRequest,
            crate::handlers::bank_statements::ImportTransactionsRequest,
            crate::handlers::bank_statements::StatementTransaction,
            crate::handlers::bank_statements::BankStatementResponse,
            crate::handlers::bank_statements::ImportResult,
            crate::handlers::transactions::CreateTransactionRequest,
            crate::handlers::transactions::UpdateTransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::goals::CreateGoalRequest,
            crate::handlers::goals::UpdateGoalRequest,
            crate::handlers::goals::GoalProgressRequest,
            crate::handlers::goals::GoalResponse,
            crate::handlers::insights::InsightResponse,
            crate::handlers::notifications::PreferencesResponse,
            crate::handlers::notifications::UpdatePreferencesRequest,
            crate::handlers::notifications::MonthlySummaryEmailResult,
            crate::handlers::admin::TestEmailRequest,
            crate::handlers::admin::TestLlmRequest,
            crate::handlers::admin::TestLlmResponse,
            crate::handlers::admin::DatabaseStatus,
            common::CategoryBreakdown,
            common::CategorySpending,
            common::MonthlySummary,
            common::SpendingChart,
            common::SpendingPoint,
            common::ChartInterval,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and sessions"),
        (name = "users", description = "Profile and onboarding"),
        (name = "bank-accounts", description = "Bank account management"),
        (name = "bank-statements", description = "Statement uploads and imports"),
        (name = "transactions", description = "Transaction management"),
        (name = "categories", description = "Spending categories"),
        (name = "goals", description = "Savings goals"),
        (name = "insights", description = "Generated financial insights"),
        (name = "analytics", description = "Spending analytics"),
        (name = "notifications", description = "Email notification settings"),
        (name = "admin", description = "Connectivity checks"),
    ),
    info(
        title = "FinSavvy API",
        description = "Personal finance dashboard backend - accounts, transactions, goals, analytics and insights",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
