use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use common::money::format_amount;
use common::{CategoryBreakdown, InsightDraft, MonthlySummary};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use model::entities::goal;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, info, instrument};

use crate::auth::CurrentUser;

/// A plain-text email.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;

    /// Human-readable name of the transport, reported by the admin endpoints.
    fn transport(&self) -> &'static str;
}

/// Writes emails to the log instead of sending them.
pub struct ConsoleMailer {
    pub from: String,
}

#[async_trait]
impl EmailClient for ConsoleMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Email (console transport):\n{}",
            message.text
        );
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "console"
    }
}

/// SMTP delivery through `lettre`.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// STARTTLS relay when credentials are given, plain SMTP otherwise (local relays, mail catchers).
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: &str,
    ) -> Result<Self> {
        let from: Mailbox = from
            .parse()
            .with_context(|| format!("Invalid sender address '{}'", from))?;

        let transport = match (username, password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                    .port(port)
                    .credentials(Credentials::new(username, password))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(port)
                .build(),
        };

        Ok(Self { from, transport })
    }
}

#[async_trait]
impl EmailClient for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        let to: Mailbox = message
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address '{}'", message.to))?;

        let email = lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone())?;

        self.transport.send(email).await?;
        info!(subject = %message.subject, "Sent email via SMTP.");

        Ok(())
    }

    fn transport(&self) -> &'static str {
        "smtp"
    }
}

#[derive(Serialize)]
struct CategoryLine {
    name: String,
    total: String,
    percentage: f64,
}

#[derive(Serialize)]
struct InsightLine<'a> {
    kind: String,
    title: &'a str,
    description: &'a str,
}

/// Renders the templated emails and hands them to an [`EmailClient`].
pub struct Notifier {
    client: Arc<dyn EmailClient>,
    templates: Tera,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("transport", &self.client.transport())
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(client: Arc<dyn EmailClient>) -> Result<Self> {
        let mut templates = Tera::default();
        templates.add_raw_templates(vec![
            ("emails/welcome.txt", include_str!("../../templates/emails/welcome.txt")),
            (
                "emails/goal_completed.txt",
                include_str!("../../templates/emails/goal_completed.txt"),
            ),
            (
                "emails/insights_digest.txt",
                include_str!("../../templates/emails/insights_digest.txt"),
            ),
            (
                "emails/monthly_summary.txt",
                include_str!("../../templates/emails/monthly_summary.txt"),
            ),
            ("emails/test.txt", include_str!("../../templates/emails/test.txt")),
        ])?;

        Ok(Self { client, templates })
    }

    pub fn transport(&self) -> &'static str {
        self.client.transport()
    }

    async fn deliver(&self, to: &str, subject: &str, template: &str, context: &Context) -> Result<()> {
        let text = self
            .templates
            .render(template, context)
            .with_context(|| format!("Failed to render {}", template))?;
        debug!(%to, %subject, template, "Delivering email");

        self.client
            .send(&Message {
                to: to.to_string(),
                subject: subject.to_string(),
                text,
            })
            .await
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn send_welcome(&self, user: &CurrentUser) -> Result<()> {
        let mut context = Context::new();
        context.insert("name", &user.name);
        context.insert("currency", &user.currency);
        self.deliver(&user.email, "Welcome to FinSavvy", "emails/welcome.txt", &context)
            .await
    }

    #[instrument(skip(self, user, goal), fields(user_id = user.id, goal_id = goal.id))]
    pub async fn send_goal_completed(&self, user: &CurrentUser, goal: &goal::Model) -> Result<()> {
        let mut context = Context::new();
        context.insert("name", &user.name);
        context.insert("goal_name", &goal.name);
        context.insert("target", &format_amount(goal.target_amount, &user.currency));
        context.insert("current", &format_amount(goal.current_amount, &user.currency));
        self.deliver(
            &user.email,
            &format!("Goal reached: {}", goal.name),
            "emails/goal_completed.txt",
            &context,
        )
        .await
    }

    #[instrument(skip(self, user, insights), fields(user_id = user.id, count = insights.len()))]
    pub async fn send_insights_digest(
        &self,
        user: &CurrentUser,
        period: &str,
        insights: &[InsightDraft],
    ) -> Result<()> {
        let mut context = Context::new();
        context.insert("name", &user.name);
        context.insert("period", period);
        let lines: Vec<InsightLine> = insights
            .iter()
            .map(|i| InsightLine {
                kind: i.insight_type.to_uppercase(),
                title: &i.title,
                description: &i.description,
            })
            .collect();
        context.insert("insights", &lines);
        self.deliver(
            &user.email,
            &format!("Your FinSavvy insights for {}", period),
            "emails/insights_digest.txt",
            &context,
        )
        .await
    }

    #[instrument(skip(self, user, summary, breakdown), fields(user_id = user.id))]
    pub async fn send_monthly_summary(
        &self,
        user: &CurrentUser,
        summary: &MonthlySummary,
        breakdown: &CategoryBreakdown,
    ) -> Result<()> {
        let period = format!("{}-{:02}", summary.year, summary.month);
        let categories: Vec<CategoryLine> = breakdown
            .categories
            .iter()
            .take(5)
            .map(|c| CategoryLine {
                name: c.category_name.clone(),
                total: format_amount(c.total, &user.currency),
                percentage: c.percentage,
            })
            .collect();

        let mut context = Context::new();
        context.insert("name", &user.name);
        context.insert("period", &period);
        context.insert("income", &format_amount(summary.total_income, &user.currency));
        context.insert("expenses", &format_amount(summary.total_expenses, &user.currency));
        context.insert("net", &format_amount(summary.net, &user.currency));
        context.insert("transaction_count", &summary.transaction_count);
        context.insert(
            "savings_rate",
            &summary.savings_rate.map(|rate| format!("{:.2}", rate)),
        );
        context.insert("categories", &categories);
        self.deliver(
            &user.email,
            &format!("Your FinSavvy summary for {}", period),
            "emails/monthly_summary.txt",
            &context,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn send_test(&self, to: &str) -> Result<()> {
        let mut context = Context::new();
        context.insert("sent_at", &Utc::now().to_rfc3339());
        self.deliver(to, "FinSavvy test email", "emails/test.txt", &context)
            .await
    }
}
