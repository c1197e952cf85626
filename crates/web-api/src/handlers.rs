use std::future::{ready, Ready};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use solomon_core::{DailyMetric, MetricsFilter, RunSummary};

use crate::error::ApiError;
use crate::server::AppState;

/// Raw query string of `GET /metrics`. Dates are parsed by hand so that a bad
/// value yields a JSON error instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl MetricsQuery {
    /// Converts the query string into a filter; empty values count as absent.
    ///
    /// # Errors
    /// Returns `InvalidFilter` if a date is not `YYYY-MM-DD`.
    pub fn to_filter(&self) -> Result<MetricsFilter, ApiError> {
        Ok(MetricsFilter::new(
            parse_date("start_date", self.start_date.as_deref())?,
            parse_date("end_date", self.end_date.as_deref())?,
        ))
    }
}

fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::InvalidFilter(format!("{name} must be a YYYY-MM-DD date"))),
    }
}

/// Body of `POST /login`. Fields are optional so a missing one is reported
/// as 400 with a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(email, password)`; blank values count as missing.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if either field is missing.
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let email = self.email.as_deref().map(str::trim).unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "email and password are required".to_string(),
            ));
        }
        Ok((email, password))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Exchanges an email and password for a bearer token whose subject is the
/// user id.
///
/// # Errors
/// Returns 400 for a missing field or non-JSON body and 401 for an unknown
/// email or a wrong password.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "login body rejected");
        ApiError::InvalidRequest("request body must be a JSON object".to_string())
    })?;
    let (email, password) = request.credentials()?;

    let user = state
        .users
        .find_user(email)
        .await
        .map_err(|e| ApiError::Internal(format!("user lookup failed: {e:#}")))?;
    let Some(user) = user else {
        tracing::debug!("login rejected: unknown email");
        return Err(ApiError::AuthRejected("invalid credentials"));
    };

    state.gate.verify_password(password, &user.password_hash)?;
    let access_token = state
        .gate
        .issue_token(&user.id.to_string())
        .map_err(|e| ApiError::Internal(format!("{e:#}")))?;

    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.gate.token_ttl().as_secs(),
    }))
}

/// Runs one sync and returns its summary.
///
/// # Errors
/// Returns 500 with a summarised cause if the run fails.
pub async fn run_sync(State(state): State<AppState>) -> Result<Json<RunSummary>, ApiError> {
    let summary = state.sync.run_sync().await?;
    Ok(Json(summary))
}

/// Returns the daily aggregates inside the optional date bounds, ascending.
///
/// # Errors
/// Returns 400 for an unparseable date and 500 if the read fails.
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<DailyMetric>>, ApiError> {
    let filter = query.to_filter()?;

    let rows = state
        .metrics
        .query_metrics(&filter)
        .await
        .map_err(|e| ApiError::QueryFailed(format!("{e:#}")))?;

    tracing::debug!(
        rows = rows.len(),
        start_date = ?filter.start_date,
        end_date = ?filter.end_date,
        "metrics query served"
    );
    Ok(Json(rows))
}

/// CORS preflight: 200 with an empty body.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback for a route's unsupported methods, answering 405 with `allow`
/// as the `Allow` header.
pub fn method_not_allowed(
    allow: &'static str,
) -> impl Fn() -> Ready<ApiError> + Clone + Send + Sync + 'static {
    move || ready(ApiError::MethodNotAllowed(allow))
}
