use crate::error::PipelineError;
use crate::types::{DailyMetric, MetricsFilter, RunSummary, TransactionRecord, UserCredentials};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Upstream feed of transaction records.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetches the full current batch in one read.
    async fn fetch_transactions(&self) -> Result<Vec<TransactionRecord>, PipelineError>;
}

/// Opens one atomic unit of work per sync run.
#[async_trait]
pub trait SyncStore: Send + Sync {
    type Unit: UnitOfWork;

    async fn begin(&self) -> Result<Self::Unit>;
}

/// Writes scoped to a single unit of work.
///
/// Dropping a unit without calling [`UnitOfWork::commit`] discards it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Inserts the record, or overwrites `status` and `value` when its
    /// `order_id` already exists, in one conflict-resolving write.
    async fn upsert_transaction(&mut self, record: &TransactionRecord) -> Result<()>;

    /// Most recent aggregate date visible inside this unit. A failure here
    /// must leave the unit usable.
    async fn latest_period(&mut self) -> Result<Option<NaiveDate>>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Idempotent recomputation of the daily aggregates, run inside the same
/// unit of work as the raw writes it reads.
#[async_trait]
pub trait AggregationTrigger<U: UnitOfWork>: Send + Sync {
    async fn refresh(&self, unit: &mut U) -> Result<()>;
}

/// Runs one end-to-end sync.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    async fn run_sync(&self) -> Result<RunSummary, PipelineError>;
}

/// Read side over the aggregate table.
#[async_trait]
pub trait MetricsReader: Send + Sync {
    /// Rows matching every bound set in `filter`, ascending by date.
    async fn query_metrics(&self, filter: &MetricsFilter) -> Result<Vec<DailyMetric>>;

    async fn latest_period(&self) -> Result<Option<NaiveDate>>;
}

/// Lookup of login identities by email.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, email: &str) -> Result<Option<UserCredentials>>;
}
