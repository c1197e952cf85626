//! Row shapes read back from the aggregate table.
//!
//! Domain records live in `solomon-core`; these structs only exist to
//! decode query results and are converted immediately.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use solomon_core::DailyMetric;

/// One row of `aggregated.daily_metrics`, as selected by the metrics query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyMetricRow {
    pub date: NaiveDate,
    pub total_revenue_approved: Decimal,
    pub total_revenue_pending: Decimal,
    pub total_revenue_cancelled: Decimal,
    pub count_approved: i64,
    pub count_pending: i64,
    pub count_cancelled: i64,
}

impl From<DailyMetricRow> for DailyMetric {
    fn from(row: DailyMetricRow) -> Self {
        Self {
            date: row.date,
            total_revenue_approved: row.total_revenue_approved,
            total_revenue_pending: row.total_revenue_pending,
            total_revenue_cancelled: row.total_revenue_cancelled,
            count_approved: row.count_approved,
            count_pending: row.count_pending,
            count_cancelled: row.count_cancelled,
        }
    }
}
