//! Response mapping.
//!
//! # Responsibilities
//! - Map a service report to 200 (online) or 502 (offline / error)
//! - Render gateway-level failures as `{"status": "error", "error": ...}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::IntegrationError;
use crate::health::state::ServiceReport;

/// A failure answered by the gateway itself.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<IntegrationError> for ApiError {
    fn from(error: IntegrationError) -> Self {
        let status = match error {
            IntegrationError::UnknownService(_) => StatusCode::NOT_FOUND,
            IntegrationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": "error", "error": self.message })),
        )
            .into_response()
    }
}

/// 200 for an online report, 502 otherwise. The body is the report either way.
pub fn report_response(report: ServiceReport) -> Response {
    let status = if report.is_online() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(report)).into_response()
}
