//! Sync pipeline: pull the transaction feed, upsert it and refresh the daily
//! aggregates as one atomic run.

pub mod orchestrator;
pub mod source;

pub use orchestrator::{PgSyncOrchestrator, SyncOrchestrator, DEFAULT_UNIT_TIMEOUT};
pub use source::HttpTransactionSource;
