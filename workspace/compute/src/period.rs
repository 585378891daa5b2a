use chrono::{Datelike, NaiveDate};

use crate::error::{ComputeError, Result};

/// A calendar month with its inclusive first and last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ComputeError::InvalidPeriod(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }

        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| ComputeError::InvalidPeriod(format!("{}-{:02}", year, month)))?;
        let end = last_day_of_month(year, month)
            .ok_or_else(|| ComputeError::InvalidPeriod(format!("{}-{:02}", year, month)))?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    /// Resolves optional query parameters, defaulting to the month containing `today`.
    pub fn resolve(year: Option<i32>, month: Option<u32>, today: NaiveDate) -> Result<Self> {
        Self::new(
            year.unwrap_or_else(|| today.year()),
            month.unwrap_or_else(|| today.month()),
        )
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Last day of the given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Checks that `start` does not lie after `end`.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(ComputeError::InvalidRange { start, end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let feb_leap = MonthPeriod::new(2024, 2).unwrap();
        assert_eq!(feb_leap.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb_leap.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = MonthPeriod::new(2023, 12).unwrap();
        assert_eq!(dec.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(
            MonthPeriod::new(2024, 0),
            Err(ComputeError::InvalidPeriod(_))
        ));
        assert!(matches!(
            MonthPeriod::new(2024, 13),
            Err(ComputeError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_resolve_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let period = MonthPeriod::resolve(None, None, today).unwrap();
        assert_eq!((period.year, period.month), (2024, 5));

        let period = MonthPeriod::resolve(Some(2023), Some(1), today).unwrap();
        assert_eq!((period.year, period.month), (2023, 1));
        assert!(period.contains(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));
    }

    #[test]
    fn test_validate_range() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(validate_range(a, b).is_ok());
        assert!(validate_range(a, a).is_ok());
        assert!(validate_range(b, a).is_err());
    }
}
