use common::{CategoryBreakdown, InsightDraft, MonthlySummary};
use rust_decimal::Decimal;

use crate::categories::UNCATEGORIZED;

/// Most insights kept from one generation run.
pub const MAX_INSIGHTS: usize = 5;

/// A category taking more than this share of spending is flagged.
const DOMINANT_CATEGORY_SHARE: f64 = 40.0;

/// Savings rate considered healthy.
const HEALTHY_SAVINGS_RATE: f64 = 20.0;

/// Rule-based insights used when no language model is configured.
///
/// Output is deterministic for a given summary and breakdown.
pub fn heuristic_insights(
    summary: &MonthlySummary,
    breakdown: &CategoryBreakdown,
) -> Vec<InsightDraft> {
    let mut insights = Vec::new();

    if summary.transaction_count == 0 {
        insights.push(draft(
            "No activity this month",
            format!(
                "There are no transactions recorded for {}-{:02}. Import a statement or add transactions to get insights.",
                summary.year, summary.month
            ),
            "info",
            None,
        ));
        return insights;
    }

    if let Some(top) = breakdown.categories.first() {
        if top.percentage > DOMINANT_CATEGORY_SHARE {
            insights.push(draft(
                &format!("{} dominates your spending", top.category_name),
                format!(
                    "{} accounts for {:.1}% of this month's spending ({} across {} transactions).",
                    top.category_name, top.percentage, top.total, top.transaction_count
                ),
                "warning",
                Some(top.category_name.clone()),
            ));
        } else {
            insights.push(draft(
                &format!("Top category: {}", top.category_name),
                format!(
                    "Your largest spending category was {} with {} ({:.1}% of the total).",
                    top.category_name, top.total, top.percentage
                ),
                "info",
                Some(top.category_name.clone()),
            ));
        }
    }

    match summary.savings_rate {
        Some(rate) if rate < 0.0 => insights.push(draft(
            "Spending exceeded income",
            format!(
                "You spent {} more than you earned this month.",
                summary.net.abs()
            ),
            "warning",
            None,
        )),
        Some(rate) if rate >= HEALTHY_SAVINGS_RATE => insights.push(draft(
            "Healthy savings rate",
            format!("You saved {:.1}% of your income this month. Keep it up!", rate),
            "success",
            None,
        )),
        Some(rate) => insights.push(draft(
            "Room to save more",
            format!(
                "You saved {:.1}% of your income. Aiming for {:.0}% builds a stronger cushion.",
                rate, HEALTHY_SAVINGS_RATE
            ),
            "info",
            None,
        )),
        None => insights.push(draft(
            "No income recorded",
            "No income was recorded this month, so a savings rate could not be computed."
                .to_string(),
            "info",
            None,
        )),
    }

    if let Some(salary) = summary.monthly_salary {
        if salary > Decimal::ZERO && summary.total_expenses > salary {
            insights.push(draft(
                "Expenses above salary",
                format!(
                    "This month's expenses ({}) are higher than your monthly salary ({}).",
                    summary.total_expenses, salary
                ),
                "warning",
                None,
            ));
        }
    }

    if let Some(uncategorized) = breakdown
        .categories
        .iter()
        .find(|c| c.category_name == UNCATEGORIZED)
    {
        insights.push(draft(
            "Uncategorized spending",
            format!(
                "{} transactions totalling {} have no category. Categorizing them sharpens your analytics.",
                uncategorized.transaction_count, uncategorized.total
            ),
            "info",
            None,
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

fn draft(title: &str, description: String, kind: &str, category: Option<String>) -> InsightDraft {
    InsightDraft {
        title: title.to_string(),
        description,
        insight_type: kind.to_string(),
        category,
        related_transactions: Vec::new(),
    }
}
