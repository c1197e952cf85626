//! Data storage for the metrics pipeline.
//!
//! This crate provides:
//! - Database client for `PostgreSQL`
//! - The raw transaction upsert and the daily metrics reader
//! - The transactional store and aggregation trigger used by sync runs
//! - The `auth.users` lookup behind login

pub mod database;
pub mod models;
pub mod repositories;
pub mod store;

pub use database::DatabaseClient;
pub use models::DailyMetricRow;
pub use repositories::{
    build_metrics_query, DailyMetricsRepository, TransactionRepository, UserRepository,
    UPSERT_TRANSACTION_SQL,
};
pub use store::{PgSyncStore, PgUnitOfWork, ProcedureTrigger};
