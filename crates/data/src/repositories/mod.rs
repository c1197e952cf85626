//! Database repositories for the metrics pipeline.
//!
//! Raw transactions are written through the caller's connection; aggregate
//! rows are only ever read. Login identities live in `auth.users`.

pub mod daily_metrics_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use daily_metrics_repo::{build_metrics_query, DailyMetricsRepository};
pub use transaction_repo::{TransactionRepository, UPSERT_TRANSACTION_SQL};
pub use user_repo::UserRepository;
