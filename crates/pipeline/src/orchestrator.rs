//! Sync orchestrator.
//!
//! A run is strictly sequential: fetch the feed, open one unit of work,
//! upsert every record in input order, trigger the aggregation, read the
//! latest aggregate date, commit. Any failure after the unit is opened
//! discards it, so a run either lands completely or not at all.

use async_trait::async_trait;
use chrono::NaiveDate;
use solomon_core::{
    AggregationTrigger, AppConfig, PipelineError, RunSummary, SyncRunner, SyncStore,
    TransactionRecord, TransactionSource, UnitOfWork,
};
use solomon_data::{DatabaseClient, PgSyncStore, ProcedureTrigger};
use std::time::{Duration, Instant};

use crate::source::HttpTransactionSource;

/// Deadline applied to the unit of work when none is configured.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Orchestrator wired to the HTTP feed and Postgres.
pub type PgSyncOrchestrator =
    SyncOrchestrator<HttpTransactionSource, PgSyncStore, ProcedureTrigger>;

pub struct SyncOrchestrator<S, St, A> {
    source: S,
    store: St,
    trigger: A,
    unit_timeout: Duration,
}

impl<S, St, A> SyncOrchestrator<S, St, A>
where
    S: TransactionSource,
    St: SyncStore,
    A: AggregationTrigger<St::Unit>,
{
    #[must_use]
    pub fn new(source: S, store: St, trigger: A) -> Self {
        Self {
            source,
            store,
            trigger,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
        }
    }

    /// Bounds how long a unit of work may stay open.
    #[must_use]
    pub fn with_unit_timeout(mut self, unit_timeout: Duration) -> Self {
        self.unit_timeout = unit_timeout;
        self
    }

    /// Runs one sync end to end.
    ///
    /// # Errors
    /// Returns the first failure; nothing is committed unless the error is
    /// `CommitFailed`, whose outcome is unknown.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let result = self.execute().await;

        match &result {
            Ok(summary) => tracing::info!(
                records = summary.records_synced,
                latest = %summary.last_processed_period,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sync run committed"
            ),
            Err(e) => tracing::error!(
                error = %e,
                outcome_unknown = e.is_outcome_unknown(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sync run failed"
            ),
        }

        result
    }

    async fn execute(&self) -> Result<RunSummary, PipelineError> {
        let records = self.source.fetch_transactions().await?;
        tracing::info!(records = records.len(), "fetched transaction batch");

        let deadline = tokio::time::Instant::now() + self.unit_timeout;

        // Dropping the timed-out future drops the unit, which discards it.
        let (unit, latest) = tokio::time::timeout_at(deadline, self.prepare(&records))
            .await
            .map_err(|_| {
                PipelineError::Timeout(format!(
                    "unit of work exceeded {}ms",
                    self.unit_timeout.as_millis()
                ))
            })??;

        // Once COMMIT is sent the store may apply it regardless of what
        // happens here, so every failure from this point is outcome-unknown.
        tokio::time::timeout_at(deadline, unit.commit())
            .await
            .map_err(|_| {
                PipelineError::CommitFailed(format!(
                    "commit did not finish within the {}ms unit deadline",
                    self.unit_timeout.as_millis()
                ))
            })?
            .map_err(|e| PipelineError::CommitFailed(format!("{e:#}")))?;

        Ok(RunSummary::success(records.len(), latest))
    }

    /// Opens the unit and applies every write short of the commit.
    async fn prepare(
        &self,
        records: &[TransactionRecord],
    ) -> Result<(St::Unit, Option<NaiveDate>), PipelineError> {
        let mut unit = self
            .store
            .begin()
            .await
            .map_err(|e| PipelineError::Storage(format!("{e:#}")))?;

        for record in records {
            let written = unit.upsert_transaction(record).await;
            if let Err(e) = written {
                discard(unit).await;
                return Err(PipelineError::insert_failed(
                    &record.order_id,
                    format!("{e:#}"),
                ));
            }
        }

        let refreshed = self.trigger.refresh(&mut unit).await;
        if let Err(e) = refreshed {
            discard(unit).await;
            return Err(PipelineError::AggregationFailed(format!("{e:#}")));
        }

        // Diagnostic only: a failed read degrades to the sentinel.
        let latest = match unit.latest_period().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "latest period lookup failed");
                None
            }
        };

        Ok((unit, latest))
    }
}

async fn discard<U: UnitOfWork>(unit: U) {
    if let Err(e) = unit.rollback().await {
        tracing::warn!(error = %e, "explicit rollback failed; unit discarded on drop");
    }
}

#[async_trait]
impl<S, St, A> SyncRunner for SyncOrchestrator<S, St, A>
where
    S: TransactionSource,
    St: SyncStore,
    A: AggregationTrigger<St::Unit>,
{
    async fn run_sync(&self) -> Result<RunSummary, PipelineError> {
        self.run().await
    }
}

impl PgSyncOrchestrator {
    /// Wires the HTTP feed, the Postgres store and the aggregation procedure
    /// named in `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or the procedure
    /// name is not a plain identifier.
    pub fn from_config(config: &AppConfig, database: &DatabaseClient) -> anyhow::Result<Self> {
        let source = HttpTransactionSource::new(&config.source)?;
        let store = PgSyncStore::new(database.pool().clone());
        let trigger = ProcedureTrigger::new(&config.pipeline.aggregation_procedure)?;

        Ok(Self::new(source, store, trigger).with_unit_timeout(Duration::from_secs(
            config.pipeline.unit_of_work_timeout_secs,
        )))
    }
}
