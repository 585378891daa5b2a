use common::MonthlySummary;
use model::entities::transaction;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::categories::share;
use crate::period::MonthPeriod;

/// Income, expenses and savings rate of one month.
#[instrument(skip(transactions), fields(num_transactions = transactions.len()))]
pub fn monthly_summary(
    period: &MonthPeriod,
    transactions: &[transaction::Model],
    monthly_salary: Option<Decimal>,
) -> MonthlySummary {
    let mut total_income = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    let mut transaction_count = 0;

    for tx in transactions.iter().filter(|t| period.contains(t.date)) {
        if tx.is_credit() {
            total_income += tx.amount.abs();
        } else {
            total_expenses += tx.amount.abs();
        }
        transaction_count += 1;
    }

    let net = total_income - total_expenses;
    let savings_rate = if total_income > Decimal::ZERO {
        Some(share(net, total_income))
    } else {
        None
    };

    MonthlySummary {
        year: period.year,
        month: period.month,
        total_income,
        total_expenses,
        net,
        transaction_count,
        savings_rate,
        monthly_salary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tx;

    #[test]
    fn test_monthly_summary() {
        let period = MonthPeriod::new(2024, 4).unwrap();
        let transactions = vec![
            tx(1, "2024-04-01", Decimal::new(4000, 0), None),
            tx(2, "2024-04-02", Decimal::new(-1200, 0), Some(5)),
            tx(3, "2024-04-15", Decimal::new(-800, 0), Some(1)),
            tx(4, "2024-05-01", Decimal::new(-50, 0), Some(1)),
        ];

        let summary = monthly_summary(&period, &transactions, Some(Decimal::new(4000, 0)));

        assert_eq!(summary.total_income, Decimal::new(4000, 0));
        assert_eq!(summary.total_expenses, Decimal::new(2000, 0));
        assert_eq!(summary.net, Decimal::new(2000, 0));
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.savings_rate, Some(50.0));
        assert_eq!(summary.monthly_salary, Some(Decimal::new(4000, 0)));
    }

    #[test]
    fn test_no_income_has_no_savings_rate() {
        let period = MonthPeriod::new(2024, 4).unwrap();
        let transactions = vec![tx(1, "2024-04-03", Decimal::new(-25, 0), None)];

        let summary = monthly_summary(&period, &transactions, None);

        assert_eq!(summary.net, Decimal::new(-25, 0));
        assert_eq!(summary.savings_rate, None);
    }

    #[test]
    fn test_overspending_gives_negative_rate() {
        let period = MonthPeriod::new(2024, 4).unwrap();
        let transactions = vec![
            tx(1, "2024-04-01", Decimal::new(1000, 0), None),
            tx(2, "2024-04-02", Decimal::new(-1500, 0), None),
        ];

        let summary = monthly_summary(&period, &transactions, None);
        assert_eq!(summary.savings_rate, Some(-50.0));
    }
}
