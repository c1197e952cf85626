//! Store behaviour against a live Postgres.
//!
//! Skipped unless `SOLOMON_TEST_DATABASE_URL` points at a disposable database.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use solomon_core::{AggregationTrigger, MetricsFilter, SyncStore, TransactionRecord, UnitOfWork};
use solomon_data::{
    DailyMetricsRepository, DatabaseClient, PgSyncStore, ProcedureTrigger, TransactionRepository,
    UserRepository,
};

const FIXTURE: &str = r#"
CREATE SCHEMA IF NOT EXISTS raw_data;
CREATE SCHEMA IF NOT EXISTS aggregated;
CREATE SCHEMA IF NOT EXISTS auth;
CREATE TABLE IF NOT EXISTS auth.users (
    id SERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS raw_data.transactions (
    order_id TEXT PRIMARY KEY,
    created_at TIMESTAMP NOT NULL,
    status TEXT NOT NULL,
    value NUMERIC(12, 2) NOT NULL,
    payment_method TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS aggregated.daily_metrics (
    date DATE PRIMARY KEY,
    total_revenue_approved NUMERIC(14, 2) NOT NULL DEFAULT 0,
    total_revenue_pending NUMERIC(14, 2) NOT NULL DEFAULT 0,
    total_revenue_cancelled NUMERIC(14, 2) NOT NULL DEFAULT 0,
    count_approved INTEGER NOT NULL DEFAULT 0,
    count_pending INTEGER NOT NULL DEFAULT 0,
    count_cancelled INTEGER NOT NULL DEFAULT 0
);
CREATE OR REPLACE PROCEDURE solomon_test_refresh_metrics()
LANGUAGE plpgsql AS $$
BEGIN
    INSERT INTO aggregated.daily_metrics
    SELECT created_at::DATE,
           COALESCE(SUM(value) FILTER (WHERE status = 'approved'), 0),
           COALESCE(SUM(value) FILTER (WHERE status = 'pending'), 0),
           COALESCE(SUM(value) FILTER (WHERE status = 'cancelled'), 0),
           COUNT(*) FILTER (WHERE status = 'approved'),
           COUNT(*) FILTER (WHERE status = 'pending'),
           COUNT(*) FILTER (WHERE status = 'cancelled')
    FROM raw_data.transactions
    GROUP BY created_at::DATE
    ON CONFLICT (date) DO UPDATE SET
        total_revenue_approved = EXCLUDED.total_revenue_approved,
        total_revenue_pending = EXCLUDED.total_revenue_pending,
        total_revenue_cancelled = EXCLUDED.total_revenue_cancelled,
        count_approved = EXCLUDED.count_approved,
        count_pending = EXCLUDED.count_pending,
        count_cancelled = EXCLUDED.count_cancelled;
END $$;
"#;

async fn connect() -> Option<DatabaseClient> {
    let url = std::env::var("SOLOMON_TEST_DATABASE_URL").ok()?;
    let client = DatabaseClient::new(&url, 2).await.expect("connect");
    sqlx::raw_sql(FIXTURE)
        .execute(client.pool())
        .await
        .expect("fixture");
    Some(client)
}

fn unique_id(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

fn record(order_id: &str, status: &str, value: rust_decimal::Decimal) -> TransactionRecord {
    TransactionRecord {
        order_id: order_id.to_string(),
        created_at: NaiveDate::from_ymd_opt(2031, 3, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap(),
        status: status.to_string(),
        value,
        payment_method: "pix".to_string(),
    }
}

#[tokio::test]
async fn test_upsert_converges_to_latest_status_and_value() {
    let Some(client) = connect().await else {
        return;
    };
    let store = PgSyncStore::new(client.pool().clone());
    let order_id = unique_id("upsert");

    let mut unit = store.begin().await.unwrap();
    unit.upsert_transaction(&record(&order_id, "approved", dec!(100)))
        .await
        .unwrap();
    let mut second = record(&order_id, "cancelled", dec!(80));
    second.payment_method = "card".to_string();
    unit.upsert_transaction(&second).await.unwrap();
    unit.commit().await.unwrap();

    let mut conn = client.pool().acquire().await.unwrap();
    let stored = TransactionRepository::find(&mut conn, &order_id)
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(stored.status, "cancelled");
    assert_eq!(stored.value, dec!(80));
    assert_eq!(stored.payment_method, "pix");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM raw_data.transactions WHERE order_id = $1")
            .bind(&order_id)
            .fetch_one(client.pool())
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_dropped_unit_discards_writes() {
    let Some(client) = connect().await else {
        return;
    };
    let store = PgSyncStore::new(client.pool().clone());
    let order_id = unique_id("dropped");

    {
        let mut unit = store.begin().await.unwrap();
        unit.upsert_transaction(&record(&order_id, "approved", dec!(10)))
            .await
            .unwrap();
    }

    let mut conn = client.pool().acquire().await.unwrap();
    assert!(TransactionRepository::find(&mut conn, &order_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_failed_trigger_leaves_unit_rollbackable() {
    let Some(client) = connect().await else {
        return;
    };
    let store = PgSyncStore::new(client.pool().clone());
    let order_id = unique_id("failed-trigger");
    let missing = ProcedureTrigger::new("solomon_test_procedure_that_does_not_exist").unwrap();

    let mut unit = store.begin().await.unwrap();
    unit.upsert_transaction(&record(&order_id, "approved", dec!(10)))
        .await
        .unwrap();
    assert!(missing.refresh(&mut unit).await.is_err());
    unit.rollback().await.unwrap();

    let mut conn = client.pool().acquire().await.unwrap();
    assert!(TransactionRepository::find(&mut conn, &order_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_refresh_then_filtered_read() {
    let Some(client) = connect().await else {
        return;
    };
    let store = PgSyncStore::new(client.pool().clone());
    let trigger = ProcedureTrigger::new("solomon_test_refresh_metrics").unwrap();

    let day = NaiveDate::from_ymd_opt(2031, 3, 5);
    let mut fresh = record(&unique_id("agg"), "approved", dec!(25));
    fresh.created_at = day.unwrap().and_hms_opt(12, 0, 0).unwrap();

    let mut unit = store.begin().await.unwrap();
    unit.upsert_transaction(&fresh).await.unwrap();
    trigger.refresh(&mut unit).await.unwrap();
    let latest = unit.latest_period().await.unwrap();
    unit.commit().await.unwrap();
    assert!(latest >= day);

    let metrics = DailyMetricsRepository::new(client.pool().clone());
    let rows = metrics.query(&MetricsFilter::new(day, day)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].count_approved >= 1);

    let first = metrics.query(&MetricsFilter::new(day, day)).await.unwrap();
    let mut unit = store.begin().await.unwrap();
    trigger.refresh(&mut unit).await.unwrap();
    unit.commit().await.unwrap();
    let second = metrics.query(&MetricsFilter::new(day, day)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_user_creation_is_idempotent() {
    let Some(client) = connect().await else {
        return;
    };
    let users = UserRepository::new(client.pool().clone());
    let email = format!("{}@example.com", unique_id("admin"));

    assert!(users.create_if_absent(&email, "hash-one").await.unwrap());
    assert!(!users.create_if_absent(&email, "hash-two").await.unwrap());

    let stored = users.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(stored.email, email);
    assert_eq!(stored.password_hash, "hash-one");
    let missing = users.find_by_email("nobody@example.com").await.unwrap();
    assert!(missing.is_none());
}
