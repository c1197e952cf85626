//! Raw transaction repository.
//!
//! Writes go through the caller's connection so they land inside the sync
//! run's transaction.

use anyhow::Result;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use solomon_core::TransactionRecord;
use sqlx::PgConnection;

type StoredTransaction = (String, NaiveDateTime, String, Decimal, String);

/// Insert-or-update keyed by `order_id`. On conflict only `status` and
/// `value` change; `created_at` and `payment_method` keep their first values.
pub const UPSERT_TRANSACTION_SQL: &str = r#"
    INSERT INTO raw_data.transactions (order_id, created_at, status, value, payment_method)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (order_id) DO UPDATE
    SET status = EXCLUDED.status,
        value = EXCLUDED.value
"#;

/// Repository for `raw_data.transactions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRepository;

impl TransactionRepository {
    /// Upserts one record on `conn` with a single statement, so concurrent
    /// writers on the same key are resolved by the database.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    pub async fn upsert(conn: &mut PgConnection, record: &TransactionRecord) -> Result<()> {
        sqlx::query(UPSERT_TRANSACTION_SQL)
            .bind(&record.order_id)
            .bind(record.created_at)
            .bind(&record.status)
            .bind(record.value)
            .bind(&record.payment_method)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Fetches a stored record by natural key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find(
        conn: &mut PgConnection,
        order_id: &str,
    ) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, StoredTransaction>(
            r#"
            SELECT order_id, created_at::TIMESTAMP, status, value::NUMERIC, payment_method
            FROM raw_data.transactions
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(
            |(order_id, created_at, status, value, payment_method)| TransactionRecord {
                order_id,
                created_at,
                status,
                value,
                payment_method,
            },
        ))
    }
}
