//! Error responses for the HTTP surface.
//!
//! Every failure is rendered as `{"error": "<message>"}`. Server-side causes
//! are logged; the body only ever carries a short summary.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use solomon_core::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired or wrongly signed bearer credential.
    #[error("{0}")]
    AuthRejected(&'static str),

    /// Carries the value of the `Allow` header for the route.
    #[error("method not allowed")]
    MethodNotAllowed(&'static str),

    /// A query parameter could not be parsed.
    #[error("{0}")]
    InvalidFilter(String),

    /// The request body is missing or lacks required fields.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("metrics query failed: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    Sync(#[from] PipelineError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthRejected(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidFilter(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::QueryFailed(_) | Self::Sync(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::QueryFailed(_) => "failed to query daily metrics".to_string(),
            Self::Sync(e) => e.public_message(),
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }

        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        let mut response = (status, body).into_response();
        if let Self::MethodNotAllowed(allow) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::AuthRejected("missing bearer token").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::MethodNotAllowed("POST").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::InvalidRequest("email is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidFilter("bad date".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Sync(PipelineError::Timeout("60s".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = ApiError::QueryFailed("column \"date\" does not exist".into());
        assert_eq!(err.public_message(), "failed to query daily metrics");

        let err = ApiError::Sync(PipelineError::AggregationFailed(
            "CALL refresh_dashboard_metrics() failed".into(),
        ));
        assert!(!err.public_message().contains("CALL"));
    }

    #[test]
    fn test_method_not_allowed_sets_allow_header() {
        let response = ApiError::MethodNotAllowed("GET, OPTIONS").into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, OPTIONS");
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = ApiError::Internal("invalid password hash: salt too short".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");
    }
}
