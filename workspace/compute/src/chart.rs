use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use common::{ChartInterval, SpendingChart, SpendingPoint};
use model::entities::transaction;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};
use crate::period::{last_day_of_month, validate_range};

/// Upper bound on the number of points a single chart may contain.
pub const MAX_BUCKETS: usize = 366;

/// Buckets transactions into daily, weekly (Monday-based) or monthly points.
///
/// Every bucket between the start and end date is emitted, with zeros where
/// there was no activity.
#[derive(Debug, Clone, Copy)]
pub struct ChartComputer {
    interval: ChartInterval,
}

impl ChartComputer {
    pub fn new(interval: ChartInterval) -> Self {
        Self { interval }
    }

    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self.interval {
            ChartInterval::Daily => date,
            ChartInterval::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            ChartInterval::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Last day of the bucket starting at `start`.
    fn bucket_end(&self, start: NaiveDate) -> NaiveDate {
        match self.interval {
            ChartInterval::Daily => start,
            ChartInterval::Weekly => start + Duration::days(6),
            ChartInterval::Monthly => {
                last_day_of_month(start.year(), start.month()).unwrap_or(start)
            }
        }
    }

    fn next_bucket(&self, start: NaiveDate) -> NaiveDate {
        self.bucket_end(start) + Duration::days(1)
    }

    /// Bucket starts covering `[start, end]`, failing once the range exceeds [`MAX_BUCKETS`].
    pub fn buckets(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        validate_range(start, end)?;

        let mut buckets = Vec::new();
        let mut current = self.bucket_start(start);
        while current <= end {
            if buckets.len() == MAX_BUCKETS {
                return Err(ComputeError::RangeTooLarge {
                    buckets: buckets.len() + 1,
                    max: MAX_BUCKETS,
                });
            }
            buckets.push(current);
            current = self.next_bucket(current);
        }
        Ok(buckets)
    }

    #[instrument(skip(self, transactions), fields(interval = ?self.interval, num_transactions = transactions.len()))]
    pub fn compute(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        transactions: &[transaction::Model],
    ) -> Result<SpendingChart> {
        let mut totals: BTreeMap<NaiveDate, (Decimal, Decimal)> = self
            .buckets(start, end)?
            .into_iter()
            .map(|bucket| (bucket, (Decimal::ZERO, Decimal::ZERO)))
            .collect();

        for tx in transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
        {
            if let Some((income, expenses)) = totals.get_mut(&self.bucket_start(tx.date)) {
                if tx.is_credit() {
                    *income += tx.amount.abs();
                } else {
                    *expenses += tx.amount.abs();
                }
            }
        }

        debug!("Produced {} chart points", totals.len());

        let points = totals
            .into_iter()
            .map(|(period_start, (income, expenses))| SpendingPoint {
                period_start,
                period_end: self.bucket_end(period_start),
                income,
                expenses,
                net: income - expenses,
            })
            .collect();

        Ok(SpendingChart {
            interval: self.interval,
            start_date: start,
            end_date: end,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tx;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_weekly_buckets_start_on_monday() {
        let computer = ChartComputer::new(ChartInterval::Weekly);
        // 2024-01-03 is a Wednesday
        assert_eq!(computer.bucket_start(date("2024-01-03")), date("2024-01-01"));
        // Sunday belongs to the week that started the Monday before
        assert_eq!(computer.bucket_start(date("2024-01-07")), date("2024-01-01"));
        assert_eq!(computer.bucket_start(date("2024-01-08")), date("2024-01-08"));
    }

    #[test]
    fn test_daily_chart_zero_fills_gaps() {
        let computer = ChartComputer::new(ChartInterval::Daily);
        let transactions = vec![
            tx(1, "2024-02-01", Decimal::new(-10, 0), None),
            tx(2, "2024-02-03", Decimal::new(100, 0), None),
            tx(3, "2024-02-03", Decimal::new(-40, 0), None),
        ];

        let chart = computer
            .compute(date("2024-02-01"), date("2024-02-04"), &transactions)
            .unwrap();

        assert_eq!(chart.points.len(), 4);
        assert_eq!(chart.points[0].expenses, Decimal::new(10, 0));
        assert_eq!(chart.points[1].income, Decimal::ZERO);
        assert_eq!(chart.points[1].expenses, Decimal::ZERO);
        assert_eq!(chart.points[2].income, Decimal::new(100, 0));
        assert_eq!(chart.points[2].net, Decimal::new(60, 0));
        assert_eq!(chart.points[3].period_start, date("2024-02-04"));
    }

    #[test]
    fn test_monthly_chart() {
        let computer = ChartComputer::new(ChartInterval::Monthly);
        let transactions = vec![
            tx(1, "2024-01-15", Decimal::new(-10, 0), None),
            tx(2, "2024-03-31", Decimal::new(-5, 0), None),
        ];

        let chart = computer
            .compute(date("2024-01-10"), date("2024-03-31"), &transactions)
            .unwrap();

        let starts: Vec<_> = chart.points.iter().map(|p| p.period_start).collect();
        assert_eq!(starts, vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-01")]);
        assert_eq!(chart.points[1].period_end, date("2024-02-29"));
        assert_eq!(chart.points[2].expenses, Decimal::new(5, 0));
    }

    #[test]
    fn test_range_limits() {
        let daily = ChartComputer::new(ChartInterval::Daily);
        // A leap year is exactly 366 days
        assert_eq!(
            daily.buckets(date("2024-01-01"), date("2024-12-31")).unwrap().len(),
            366
        );
        assert!(matches!(
            daily.buckets(date("2024-01-01"), date("2025-01-01")),
            Err(ComputeError::RangeTooLarge { .. })
        ));
        assert!(matches!(
            daily.buckets(date("2024-02-01"), date("2024-01-01")),
            Err(ComputeError::InvalidRange { .. })
        ));
    }
}
