pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{
    is_sql_identifier, AppConfig, AuthConfig, DatabaseConfig, PipelineConfig, ServerConfig,
    SourceConfig,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::PipelineError;
pub use traits::{
    AggregationTrigger, MetricsReader, SyncRunner, SyncStore, TransactionSource, UnitOfWork,
    UserDirectory,
};
pub use types::{
    DailyMetric, MetricsFilter, RunSummary, TransactionRecord, UserCredentials, UNKNOWN_PERIOD,
};
