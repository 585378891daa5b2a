use std::collections::HashMap;

use common::{CategoryBreakdown, CategorySpending};
use model::entities::{category, transaction};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, instrument};

use crate::period::MonthPeriod;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Groups a month's debit transactions by category and sums them.
///
/// Uncategorized debits (or debits pointing at a category that no longer
/// exists) are collected under [`UNCATEGORIZED`]. Totals are absolute values
/// and add up exactly to the month's spending.
#[derive(Debug, Default)]
pub struct CategoriesComputer;

impl CategoriesComputer {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, transactions, categories), fields(num_transactions = transactions.len()))]
    pub fn compute(
        &self,
        period: &MonthPeriod,
        transactions: &[transaction::Model],
        categories: &HashMap<i32, category::Model>,
    ) -> CategoryBreakdown {
        let mut totals: HashMap<Option<i32>, (Decimal, usize)> = HashMap::new();

        for tx in transactions
            .iter()
            .filter(|t| t.is_debit() && period.contains(t.date))
        {
            let key = tx.category_id.filter(|id| categories.contains_key(id));
            let entry = totals.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += tx.amount.abs();
            entry.1 += 1;
        }

        let total_spending: Decimal = totals.values().map(|(total, _)| *total).sum();
        debug!(
            "Grouped spending of {} into {} categories",
            total_spending,
            totals.len()
        );

        let mut spending: Vec<CategorySpending> = totals
            .into_iter()
            .map(|(key, (total, count))| {
                let category = key.and_then(|id| categories.get(&id));
                CategorySpending {
                    category_id: key,
                    category_name: category
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                    color: category.map(|c| c.color.clone()),
                    total,
                    transaction_count: count,
                    percentage: share(total, total_spending),
                }
            })
            .collect();

        spending.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });

        CategoryBreakdown {
            year: period.year,
            month: period.month,
            total_spending,
            categories: spending,
        }
    }
}

/// `part / whole * 100` rounded to two places; 0 when `whole` is zero.
pub(crate) fn share(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    (part / whole * Decimal::ONE_HUNDRED)
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_category, tx};
    use model::entities::transaction::TransactionType;

    fn categories() -> HashMap<i32, category::Model> {
        [make_category(1, "Food & Dining"), make_category(2, "Bills & Utilities")]
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    }

    #[test]
    fn test_compute_categories_summary() {
        let period = MonthPeriod::new(2023, 1).unwrap();
        let transactions = vec![
            tx(1, "2023-01-01", Decimal::new(-100, 0), Some(1)),
            tx(2, "2023-01-01", Decimal::new(-50, 0), Some(1)),
            tx(3, "2023-01-02", Decimal::new(-200, 0), Some(2)),
            tx(4, "2023-01-02", Decimal::new(-75, 0), None),
            // Income is not spending
            tx(5, "2023-01-03", Decimal::new(1000, 0), Some(1)),
            // Outside the month
            tx(6, "2023-02-01", Decimal::new(-999, 0), Some(1)),
        ];

        let breakdown = CategoriesComputer::new().compute(&period, &transactions, &categories());

        assert_eq!(breakdown.total_spending, Decimal::new(425, 0));
        assert_eq!(breakdown.categories.len(), 3);

        let names: Vec<_> = breakdown
            .categories
            .iter()
            .map(|c| c.category_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bills & Utilities", "Food & Dining", UNCATEGORIZED]);

        let food = &breakdown.categories[1];
        assert_eq!(food.total, Decimal::new(150, 0));
        assert_eq!(food.transaction_count, 2);
        assert_eq!(food.category_id, Some(1));

        let uncategorized = &breakdown.categories[2];
        assert_eq!(uncategorized.category_id, None);
        assert_eq!(uncategorized.total, Decimal::new(75, 0));
    }

    #[test]
    fn test_totals_sum_to_month_spending() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let transactions = vec![
            tx(1, "2024-03-01", Decimal::new(-1234, 2), Some(1)),
            tx(2, "2024-03-05", Decimal::new(-999, 2), Some(2)),
            tx(3, "2024-03-09", Decimal::new(-1, 2), None),
            tx(4, "2024-03-12", Decimal::new(-33333, 3), Some(1)),
            tx(5, "2024-03-31", Decimal::new(-5000, 2), Some(42)),
        ];

        let breakdown = CategoriesComputer::new().compute(&period, &transactions, &categories());

        let expected: Decimal = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Debit)
            .map(|t| t.amount.abs())
            .sum();
        let grouped: Decimal = breakdown.categories.iter().map(|c| c.total).sum();
        assert_eq!(grouped, expected);
        assert_eq!(breakdown.total_spending, expected);

        // Unknown category 42 folds into Uncategorized
        let uncategorized = breakdown
            .categories
            .iter()
            .find(|c| c.category_name == UNCATEGORIZED)
            .unwrap();
        assert_eq!(uncategorized.transaction_count, 2);
    }

    #[test]
    fn test_empty_month() {
        let period = MonthPeriod::new(2024, 3).unwrap();
        let breakdown = CategoriesComputer::new().compute(&period, &[], &categories());
        assert_eq!(breakdown.total_spending, Decimal::ZERO);
        assert!(breakdown.categories.is_empty());
    }

    #[test]
    fn test_share() {
        assert_eq!(share(Decimal::new(1, 0), Decimal::new(4, 0)), 25.0);
        assert_eq!(share(Decimal::new(1, 0), Decimal::ZERO), 0.0);
    }
}
