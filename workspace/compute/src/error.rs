use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Year/month pair that does not name a calendar month
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Date range whose start lies after its end
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// Chart request that would produce too many buckets
    #[error("Date range too large: {buckets} buckets (max {max})")]
    RangeTooLarge { buckets: usize, max: usize },
}

impl ComputeError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ComputeError::Database(_))
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
