//! Postgres implementation of the sync unit of work.
//!
//! One `sqlx::Transaction` backs each sync run. Dropping a [`PgUnitOfWork`]
//! without committing rolls the transaction back, which covers early returns
//! and cancelled futures.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use solomon_core::{
    is_sql_identifier, AggregationTrigger, SyncStore, TransactionRecord, UnitOfWork,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::repositories::{DailyMetricsRepository, TransactionRepository};

/// Opens a Postgres transaction per sync run.
#[derive(Debug, Clone)]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self
            .pool
            .begin()
            .await
            .context("failed to open transaction")?;
        tracing::debug!("sync unit of work opened");
        Ok(PgUnitOfWork { tx })
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    /// Connection bound to this unit's transaction.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn upsert_transaction(&mut self, record: &TransactionRecord) -> Result<()> {
        TransactionRepository::upsert(&mut self.tx, record).await
    }

    /// The read is wrapped in a savepoint. In Postgres a failed statement
    /// aborts the whole transaction and turns the later `COMMIT` into a
    /// rollback, so the failure has to be contained here.
    async fn latest_period(&mut self) -> Result<Option<NaiveDate>> {
        sqlx::query("SAVEPOINT latest_period")
            .execute(&mut *self.tx)
            .await?;

        let read = DailyMetricsRepository::latest_date_on(&mut self.tx).await;
        match read {
            Ok(latest) => {
                sqlx::query("RELEASE SAVEPOINT latest_period")
                    .execute(&mut *self.tx)
                    .await?;
                Ok(latest)
            }
            Err(e) => {
                sqlx::query("ROLLBACK TO SAVEPOINT latest_period")
                    .execute(&mut *self.tx)
                    .await
                    .context("failed to restore savepoint after latest period read")?;
                Err(e)
            }
        }
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Calls the server-side aggregation procedure inside the unit of work.
#[derive(Debug, Clone)]
pub struct ProcedureTrigger {
    call_sql: String,
}

impl ProcedureTrigger {
    /// Creates a trigger for `CALL <procedure>()`.
    ///
    /// The name cannot be bound as a parameter, so it must be a plain
    /// identifier (optionally schema-qualified).
    ///
    /// # Errors
    /// Returns an error if `procedure` is not a plain SQL identifier.
    pub fn new(procedure: &str) -> Result<Self> {
        if !is_sql_identifier(procedure) {
            bail!("invalid aggregation procedure name: {procedure:?}");
        }
        Ok(Self {
            call_sql: format!("CALL {procedure}()"),
        })
    }

    #[must_use]
    pub fn call_sql(&self) -> &str {
        &self.call_sql
    }
}

#[async_trait]
impl AggregationTrigger<PgUnitOfWork> for ProcedureTrigger {
    async fn refresh(&self, unit: &mut PgUnitOfWork) -> Result<()> {
        sqlx::query(&self.call_sql)
            .execute(unit.connection())
            .await
            .with_context(|| format!("{} failed", self.call_sql))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_trigger_builds_call() {
        let trigger = ProcedureTrigger::new("refresh_dashboard_metrics").unwrap();
        assert_eq!(trigger.call_sql(), "CALL refresh_dashboard_metrics()");

        let trigger = ProcedureTrigger::new("aggregated.refresh").unwrap();
        assert_eq!(trigger.call_sql(), "CALL aggregated.refresh()");
    }

    #[test]
    fn test_procedure_trigger_rejects_injection() {
        assert!(ProcedureTrigger::new("refresh(); DELETE FROM raw_data.transactions; --").is_err());
        assert!(ProcedureTrigger::new("").is_err());
    }
}
