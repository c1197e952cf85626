//! Daily aggregate metrics repository.
//!
//! Read-only access to `aggregated.daily_metrics` with optional date bounds.
//! Bounds are collected as `(predicate, value)` pairs and every value is
//! bound as a parameter; nothing user-supplied is spliced into the SQL.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use solomon_core::{DailyMetric, MetricsFilter, MetricsReader};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::DailyMetricRow;

/// Column list shared by every metrics read. Casts pin the decoded types
/// regardless of how the aggregation procedure declared the columns.
const SELECT_DAILY_METRICS: &str = "SELECT date::DATE AS date, \
     COALESCE(total_revenue_approved, 0)::NUMERIC AS total_revenue_approved, \
     COALESCE(total_revenue_pending, 0)::NUMERIC AS total_revenue_pending, \
     COALESCE(total_revenue_cancelled, 0)::NUMERIC AS total_revenue_cancelled, \
     COALESCE(count_approved, 0)::BIGINT AS count_approved, \
     COALESCE(count_pending, 0)::BIGINT AS count_pending, \
     COALESCE(count_cancelled, 0)::BIGINT AS count_cancelled \
     FROM aggregated.daily_metrics";

const SELECT_LATEST_DATE: &str = "SELECT MAX(date)::DATE FROM aggregated.daily_metrics";

/// Returns the conditions implied by `filter`, in binding order.
fn filter_predicates(filter: &MetricsFilter) -> Vec<(&'static str, NaiveDate)> {
    let mut predicates = Vec::with_capacity(2);
    if let Some(start) = filter.start_date {
        predicates.push(("date >= ", start));
    }
    if let Some(end) = filter.end_date {
        predicates.push(("date <= ", end));
    }
    predicates
}

/// Builds the metrics query for `filter`, ordered by date ascending.
#[must_use]
pub fn build_metrics_query(filter: &MetricsFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SELECT_DAILY_METRICS);

    for (i, (predicate, value)) in filter_predicates(filter).into_iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(predicate);
        builder.push_bind(value);
    }

    builder.push(" ORDER BY date ASC");
    builder
}

/// Repository for daily metrics reads.
#[derive(Debug, Clone)]
pub struct DailyMetricsRepository {
    pool: PgPool,
}

impl DailyMetricsRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queries aggregate rows within the filter's bounds.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query(&self, filter: &MetricsFilter) -> Result<Vec<DailyMetric>> {
        let mut builder = build_metrics_query(filter);
        let rows = builder
            .build_query_as::<DailyMetricRow>()
            .fetch_all(&self.pool)
            .await
            .context("daily metrics query failed")?;

        Ok(rows.into_iter().map(DailyMetric::from).collect())
    }

    /// Gets the most recent aggregated date.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let latest = sqlx::query_scalar::<_, Option<NaiveDate>>(SELECT_LATEST_DATE)
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }

    /// Same as [`Self::latest_date`] but on an explicit connection, so the
    /// read sees uncommitted writes of the caller's transaction.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn latest_date_on(conn: &mut PgConnection) -> Result<Option<NaiveDate>> {
        let latest = sqlx::query_scalar::<_, Option<NaiveDate>>(SELECT_LATEST_DATE)
            .fetch_one(conn)
            .await?;
        Ok(latest)
    }
}

#[async_trait]
impl MetricsReader for DailyMetricsRepository {
    async fn query_metrics(&self, filter: &MetricsFilter) -> Result<Vec<DailyMetric>> {
        self.query(filter).await
    }

    async fn latest_period(&self) -> Result<Option<NaiveDate>> {
        self.latest_date().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn test_no_filters_selects_everything_ordered() {
        let builder = build_metrics_query(&MetricsFilter::default());
        let sql = builder.sql();

        assert!(sql.starts_with(SELECT_DAILY_METRICS));
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with(" ORDER BY date ASC"));
    }

    #[test]
    fn test_start_only_binds_first_parameter() {
        let builder = build_metrics_query(&MetricsFilter::new(Some(day(2)), None));
        assert_eq!(
            builder.sql(),
            format!("{SELECT_DAILY_METRICS} WHERE date >= $1 ORDER BY date ASC")
        );
    }

    #[test]
    fn test_end_only_still_uses_first_parameter() {
        let builder = build_metrics_query(&MetricsFilter::new(None, Some(day(9))));
        assert_eq!(
            builder.sql(),
            format!("{SELECT_DAILY_METRICS} WHERE date <= $1 ORDER BY date ASC")
        );
    }

    #[test]
    fn test_both_bounds_are_conjunctive() {
        let builder = build_metrics_query(&MetricsFilter::new(Some(day(2)), Some(day(9))));
        assert_eq!(
            builder.sql(),
            format!("{SELECT_DAILY_METRICS} WHERE date >= $1 AND date <= $2 ORDER BY date ASC")
        );
    }

    #[test]
    fn test_predicates_follow_binding_order() {
        let predicates = filter_predicates(&MetricsFilter::new(Some(day(2)), Some(day(9))));
        assert_eq!(predicates, vec![("date >= ", day(2)), ("date <= ", day(9))]);

        assert!(filter_predicates(&MetricsFilter::default()).is_empty());
    }
}
