use std::time::Duration;

use async_trait::async_trait;
use common::money::format_amount;
use common::{CategoryBreakdown, InsightDraft, MonthlySummary};
use compute::insights::MAX_INSIGHTS;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// System prompt used for insight generation.
pub const INSIGHTS_SYSTEM_PROMPT: &str = "You are a personal finance assistant. \
Reply with a JSON array only. Each element must have the keys \"title\", \"description\", \
\"type\" (one of \"info\", \"warning\", \"success\"), optionally \"category\" and \
\"related_transactions\" (array of integers). Give at most 5 short, actionable insights.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM is not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned an empty completion")]
    EmptyResponse,

    #[error("Could not parse insights from completion: {0}")]
    Parse(String),
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// False when no backend is configured and callers should fall back.
    fn is_configured(&self) -> bool;

    /// Model name reported by the admin endpoints.
    fn model(&self) -> &str;

    /// Sends one system + user message pair and returns the completion text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Stand-in used when no API key is configured.
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    fn is_configured(&self) -> bool {
        false
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn is_configured(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, system, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        debug!("Sending chat completion request to {}", url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned status {}", status);
            return Err(LlmError::Status { status, body });
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        info!("Received completion of {} characters", content.len());
        Ok(content)
    }
}

/// Builds the user prompt describing one month of finances.
pub fn build_insights_prompt(
    summary: &MonthlySummary,
    breakdown: &CategoryBreakdown,
    currency: &str,
) -> String {
    let mut prompt = format!(
        "Monthly finances for {}-{:02} (currency {}):\n\
         - Income: {}\n\
         - Expenses: {}\n\
         - Net: {}\n\
         - Transactions: {}\n",
        summary.year,
        summary.month,
        currency,
        format_amount(summary.total_income, currency),
        format_amount(summary.total_expenses, currency),
        format_amount(summary.net, currency),
        summary.transaction_count,
    );

    if let Some(rate) = summary.savings_rate {
        prompt.push_str(&format!("- Savings rate: {:.1}%\n", rate));
    }
    if let Some(salary) = summary.monthly_salary {
        prompt.push_str(&format!("- Monthly salary: {}\n", format_amount(salary, currency)));
    }

    if !breakdown.categories.is_empty() {
        prompt.push_str("Spending by category:\n");
        for category in &breakdown.categories {
            prompt.push_str(&format!(
                "- {}: {} ({:.1}%, {} transactions)\n",
                category.category_name,
                format_amount(category.total, currency),
                category.percentage,
                category.transaction_count
            ));
        }
    }

    prompt.push_str("Give personalised insights about this month.");
    prompt
}

#[derive(Deserialize)]
struct InsightsEnvelope {
    insights: Vec<InsightDraft>,
}

/// Extracts insight drafts from a completion.
///
/// Accepts a bare JSON array, an `{"insights": [...]}` object, either of them
/// wrapped in a fenced code block, or an array embedded in surrounding prose.
/// At most [`MAX_INSIGHTS`] are returned.
pub fn parse_insights(raw: &str) -> Result<Vec<InsightDraft>, LlmError> {
    let body = strip_code_fence(raw.trim());

    let mut insights = serde_json::from_str::<Vec<InsightDraft>>(body)
        .or_else(|_| serde_json::from_str::<InsightsEnvelope>(body).map(|e| e.insights))
        .or_else(|err| match (body.find('['), body.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Vec<InsightDraft>>(&body[start..=end])
            }
            _ => Err(err),
        })
        .map_err(|e| LlmError::Parse(e.to_string()))?;

    insights.retain(|i| !i.title.trim().is_empty());
    insights.truncate(MAX_INSIGHTS);
    Ok(insights)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string, e.g. "json"
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
