//! Transport-layer types shared between the analytics computations and the
//! HTTP handlers. Everything here is serde-serializable and documented with
//! `utoipa` so handlers can return these shapes directly.

mod analytics;
mod insights;
pub mod money;

pub use analytics::{
    CategoryBreakdown, CategorySpending, ChartInterval, MonthlySummary, SpendingChart,
    SpendingPoint,
};
pub use insights::InsightDraft;
