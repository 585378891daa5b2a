use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::TokenService;
use crate::helpers::cache::build_cache;
use crate::schemas::AppState;
use crate::services::email::{ConsoleMailer, EmailClient, Notifier, SmtpMailer};
use crate::services::llm::{DisabledLlm, LlmClient, OpenAiClient};

/// Signing secret used when `JWT_SECRET` is not set. Only suitable for local use.
const DEVELOPMENT_JWT_SECRET: &str = "finsavvy-development-secret-change-me";

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cookie_secure: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub email_from: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Settings {
    /// Loads `.env` and reads the process environment over the defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings: Settings = config::Config::builder()
            .set_default("database_url", "sqlite://finsavvy.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("jwt_secret", "")?
            .set_default("token_ttl_hours", 168_i64)?
            .set_default("cookie_secure", false)?
            .set_default("smtp_port", 587_i64)?
            .set_default("email_from", "FinSavvy <no-reply@finsavvy.local>")?
            .set_default("llm_base_url", "https://api.openai.com/v1")?
            .set_default("llm_model", "gpt-4o-mini")?
            .set_default("llm_timeout_secs", 30_i64)?
            .set_default("cache_ttl_secs", 300_i64)?
            .add_source(source)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        Ok(settings.normalized())
    }

    /// Treats empty optional values as unset.
    fn normalized(mut self) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        self.smtp_host = non_empty(self.smtp_host);
        self.smtp_username = non_empty(self.smtp_username);
        self.smtp_password = non_empty(self.smtp_password);
        self.llm_api_key = non_empty(self.llm_api_key);
        self
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

fn build_notifier(settings: &Settings) -> Result<Notifier> {
    let client: Arc<dyn EmailClient> = match &settings.smtp_host {
        Some(host) => {
            info!("Sending email through SMTP at {}:{}", host, settings.smtp_port);
            Arc::new(SmtpMailer::new(
                host,
                settings.smtp_port,
                settings.smtp_username.clone(),
                settings.smtp_password.clone(),
                &settings.email_from,
            )?)
        }
        None => {
            warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(ConsoleMailer {
                from: settings.email_from.clone(),
            })
        }
    };
    Notifier::new(client)
}

fn build_llm(settings: &Settings) -> Result<Arc<dyn LlmClient>> {
    match &settings.llm_api_key {
        Some(api_key) => {
            info!(
                "Using LLM model {} at {}",
                settings.llm_model, settings.llm_base_url
            );
            Ok(Arc::new(OpenAiClient::new(
                &settings.llm_base_url,
                api_key.clone(),
                settings.llm_model.clone(),
                Duration::from_secs(settings.llm_timeout_secs),
            )?))
        }
        None => {
            warn!("LLM_API_KEY not set, insights will use the built-in heuristics");
            Ok(Arc::new(DisabledLlm))
        }
    }
}

/// Initialize application state from the loaded settings
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url).await?;

    let secret = if settings.jwt_secret.is_empty() {
        warn!("JWT_SECRET not set, using the development secret");
        DEVELOPMENT_JWT_SECRET
    } else {
        settings.jwt_secret.as_str()
    };
    let tokens = TokenService::new(secret.as_bytes(), settings.token_ttl());
    debug!("Session tokens expire after {} hours", settings.token_ttl_hours);

    Ok(AppState {
        db,
        cache: build_cache(Duration::from_secs(settings.cache_ttl_secs)),
        tokens: Arc::new(tokens),
        notifier: Arc::new(build_notifier(settings)?),
        llm: build_llm(settings)?,
        cookie_secure: settings.cookie_secure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Settings {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_source(
            config::Environment::default()
                .try_parsing(true)
                .source(Some(source)),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
        assert_eq!(settings.token_ttl_hours, 168);
        assert_eq!(settings.token_ttl(), chrono::Duration::hours(168));
        assert_eq!(settings.cache_ttl_secs, 300);
        assert!(settings.smtp_host.is_none());
        assert!(settings.llm_api_key.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = settings_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("TOKEN_TTL_HOURS", "2"),
            ("COOKIE_SECURE", "true"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("LLM_API_KEY", ""),
        ]);
        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(settings.token_ttl_hours, 2);
        assert!(settings.cookie_secure);
        assert_eq!(settings.smtp_host.as_deref(), Some("smtp.example.com"));
        assert_eq!(settings.smtp_port, 2525);
        assert!(settings.llm_api_key.is_none());
    }
}
