use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Spending of one category within a month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CategorySpending {
    /// `None` for the "Uncategorized" bucket
    pub category_id: Option<i32>,
    pub category_name: String,
    pub color: Option<String>,
    /// Absolute amount spent
    #[schema(value_type = String, example = "125.40")]
    pub total: Decimal,
    pub transaction_count: usize,
    /// Share of the month's spending, in percent
    pub percentage: f64,
}

/// Month-level category breakdown, sorted by total descending.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CategoryBreakdown {
    pub year: i32,
    pub month: u32,
    #[schema(value_type = String, example = "980.00")]
    pub total_spending: Decimal,
    pub categories: Vec<CategorySpending>,
}

/// Income/expense totals for one month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    #[schema(value_type = String, example = "3200.00")]
    pub total_income: Decimal,
    /// Absolute value of all debits
    #[schema(value_type = String, example = "1850.25")]
    pub total_expenses: Decimal,
    #[schema(value_type = String, example = "1349.75")]
    pub net: Decimal,
    pub transaction_count: usize,
    /// `net / income * 100`, absent when there was no income
    pub savings_rate: Option<f64>,
    #[schema(value_type = Option<String>)]
    pub monthly_salary: Option<Decimal>,
}

/// Bucket width of the spending chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartInterval {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

/// One bucket of the spending chart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SpendingPoint {
    /// First day of the bucket
    pub period_start: NaiveDate,
    /// Last day of the bucket
    pub period_end: NaiveDate,
    #[schema(value_type = String)]
    pub income: Decimal,
    #[schema(value_type = String)]
    pub expenses: Decimal,
    #[schema(value_type = String)]
    pub net: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SpendingChart {
    pub interval: ChartInterval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub points: Vec<SpendingPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_interval_serde() {
        let interval: ChartInterval = serde_json::from_str("\"weekly\"").unwrap();
        assert_eq!(interval, ChartInterval::Weekly);
        assert_eq!(serde_json::to_string(&ChartInterval::Daily).unwrap(), "\"daily\"");
        assert_eq!(ChartInterval::default(), ChartInterval::Monthly);
    }

    #[test]
    fn test_summary_serializes_decimals_as_strings() {
        let summary = MonthlySummary {
            year: 2024,
            month: 3,
            total_income: Decimal::new(100000, 2),
            total_expenses: Decimal::new(25050, 2),
            net: Decimal::new(74950, 2),
            transaction_count: 4,
            savings_rate: Some(74.95),
            monthly_salary: None,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_income"], "1000.00");
        assert_eq!(json["net"], "749.50");
        assert_eq!(json["savings_rate"], 74.95);
        assert!(json["monthly_salary"].is_null());
    }
}
