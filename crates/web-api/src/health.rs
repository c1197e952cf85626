//! Liveness endpoint reporting aggregate freshness.
//!
//! `GET /health` always answers 200; a failing store shows up as
//! `"unhealthy"` in the body rather than as a server error.

use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use solomon_core::UNKNOWN_PERIOD;

use crate::server::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy".
    pub status: String,
    /// Current server timestamp.
    pub timestamp: DateTime<Utc>,
    /// Most recent aggregate date, or "unknown".
    pub latest_period: String,
}

impl HealthResponse {
    fn from_lookup(lookup: &anyhow::Result<Option<NaiveDate>>) -> Self {
        let (status, latest_period) = match lookup {
            Ok(latest) => (
                "healthy",
                latest.map_or_else(|| UNKNOWN_PERIOD.to_string(), |d| d.to_string()),
            ),
            Err(_) => ("unhealthy", UNKNOWN_PERIOD.to_string()),
        };

        Self {
            status: status.to_string(),
            timestamp: Utc::now(),
            latest_period,
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let lookup = state.metrics.latest_period().await;
    if let Err(e) = &lookup {
        tracing::error!(error = %format!("{e:#}"), "health check could not read daily metrics");
    }
    Json(HealthResponse::from_lookup(&lookup))
}
