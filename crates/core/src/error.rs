//! Error taxonomy for a sync run.
//!
//! Every variant aborts the run; the unit of work is discarded before the
//! error reaches the caller, so none of them leaves partial writes behind.
//! `CommitFailed` is the exception in that the outcome is unknown.

use thiserror::Error;

/// Errors that can end a sync run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The transaction feed could not be reached or answered with a failure status.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The feed answered but the payload is not an array of transactions.
    #[error("source payload invalid: {0}")]
    SourceFormatInvalid(String),

    /// The unit of work could not be opened.
    #[error("storage unavailable: {0}")]
    Storage(String),

    /// A single upsert failed; the whole batch is discarded.
    #[error("failed to upsert transaction {order_id}: {reason}")]
    InsertFailed {
        /// Natural key of the offending record.
        order_id: String,
        /// Underlying cause.
        reason: String,
    },

    /// The aggregation procedure failed.
    #[error("aggregation failed: {0}")]
    AggregationFailed(String),

    /// The final commit failed; the store may or may not hold the run's writes.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// The feed fetch or the unit of work exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl PipelineError {
    /// Creates an insert failure for the given natural key.
    pub fn insert_failed(order_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InsertFailed {
            order_id: order_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the store may have applied the run despite the error.
    #[must_use]
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::CommitFailed(_))
    }

    /// Returns true if the run failed before any storage was touched.
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::SourceFormatInvalid(_)
        )
    }

    /// Short, caller-facing description without storage internals.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::SourceUnavailable(_) => "transaction source unavailable".to_string(),
            Self::SourceFormatInvalid(_) => {
                "transaction source returned an invalid payload".to_string()
            }
            Self::Storage(_) => "storage unavailable".to_string(),
            Self::InsertFailed { order_id, .. } => {
                format!("failed to store transaction {order_id}")
            }
            Self::AggregationFailed(_) => "failed to refresh daily metrics".to_string(),
            Self::CommitFailed(_) => "failed to commit sync run; outcome unknown".to_string(),
            Self::Timeout(_) => "sync run timed out".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_failed_names_order() {
        let err = PipelineError::insert_failed("A1", "value out of range");
        assert!(
            matches!(err, PipelineError::InsertFailed { ref order_id, .. } if order_id == "A1")
        );
        assert!(err.to_string().contains("A1"));
        assert!(err.to_string().contains("value out of range"));
    }

    #[test]
    fn test_only_commit_failure_is_outcome_unknown() {
        assert!(PipelineError::CommitFailed("connection reset".into()).is_outcome_unknown());
        assert!(!PipelineError::AggregationFailed("boom".into()).is_outcome_unknown());
        assert!(!PipelineError::Timeout("60s".into()).is_outcome_unknown());
    }

    #[test]
    fn test_source_errors() {
        assert!(PipelineError::SourceUnavailable("refused".into()).is_source_error());
        assert!(PipelineError::SourceFormatInvalid("not json".into()).is_source_error());
        assert!(!PipelineError::Storage("pool closed".into()).is_source_error());
    }

    #[test]
    fn test_public_message_hides_details() {
        let err = PipelineError::AggregationFailed(
            "ERROR: relation \"aggregated.daily_metrics\" does not exist".into(),
        );
        assert!(!err.public_message().contains("relation"));

        let err = PipelineError::insert_failed("A7", "duplicate key value violates constraint");
        assert_eq!(err.public_message(), "failed to store transaction A7");
    }
}
