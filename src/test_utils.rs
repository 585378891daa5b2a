#[cfg(test)]
pub mod test_utils {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::auth::TokenService;
    use crate::helpers::cache::build_cache;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::services::email::{EmailClient, Message, Notifier};
    use crate::services::llm::{DisabledLlm, LlmClient, LlmError};
    use async_trait::async_trait;
    use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
    use axum::Router;
    use axum_test::TestServer;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    pub const TEST_JWT_SECRET: &[u8] = b"finsavvy-test-secret";
    pub const TEST_PASSWORD: &str = "correct horse battery";

    /// Mailer that keeps every message in memory.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
    }

    impl RecordingMailer {
        pub fn messages(&self) -> Vec<Message> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailClient for RecordingMailer {
        async fn send(&self, message: &Message) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn transport(&self) -> &'static str {
            "recording"
        }
    }

    /// Mailer whose every delivery fails.
    pub struct FailingMailer;

    #[async_trait]
    impl EmailClient for FailingMailer {
        async fn send(&self, _message: &Message) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        fn transport(&self) -> &'static str {
            "failing"
        }
    }

    /// Language model returning a fixed completion, or failing when `reply` is `None`.
    pub struct StubLlm {
        pub reply: Option<String>,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        fn is_configured(&self) -> bool {
            true
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.reply.clone().ok_or(LlmError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_tokens() -> TokenService {
        TokenService::new(TEST_JWT_SECRET, chrono::Duration::hours(1))
    }

    /// Create AppState for testing with the given collaborators
    pub async fn setup_test_app_state_with(
        mailer: Arc<dyn EmailClient>,
        llm: Arc<dyn LlmClient>,
    ) -> AppState {
        let db = setup_test_db().await;
        AppState {
            db,
            cache: build_cache(Duration::from_secs(300)),
            tokens: Arc::new(test_tokens()),
            notifier: Arc::new(Notifier::new(mailer).expect("Failed to load email templates")),
            llm,
            cookie_secure: false,
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        setup_test_app_state_with(Arc::new(RecordingMailer::default()), Arc::new(DisabledLlm))
            .await
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from RUST_LOG, defaulting to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub fn test_router(state: AppState) -> Router {
        let _ = init_test_tracing();
        create_router(state, false)
    }

    /// Create axum app for testing with a recording mailer and no LLM
    pub async fn setup_test_app() -> Router {
        test_router(setup_test_app_state().await)
    }

    /// Server plus the mailer it sends through.
    pub async fn setup_test_server() -> (TestServer, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let state = setup_test_app_state_with(mailer.clone(), Arc::new(DisabledLlm)).await;
        let server = TestServer::new(test_router(state)).unwrap();
        (server, mailer)
    }

    /// `Authorization` header value for a bearer token.
    pub fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    /// Registers a user and returns its bearer token and id.
    pub async fn register_user(server: &TestServer, email: &str) -> (String, i64) {
        let response = server
            .post("/api/auth/register")
            .json(&serde_json::json!({
                "email": email,
                "password": TEST_PASSWORD,
                "name": "Test User",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["id"].as_i64().unwrap();
        (token, id)
    }

    /// Creates a bank account for the token's user and returns its id.
    pub async fn create_account(server: &TestServer, token: &str, balance: &str) -> i64 {
        let response = server
            .post("/api/bank-accounts")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&serde_json::json!({
                "name": "Everyday Checking",
                "account_type": "checking",
                "balance": balance,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        body["data"]["id"].as_i64().unwrap()
    }
}
