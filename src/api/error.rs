use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::TelemetryError;

/// Failure of an HTTP request. Only the message crosses the boundary.
#[derive(Debug)]
pub enum ApiError {
    Telemetry(TelemetryError),
    InvalidJson(String),
}

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        ApiError::Telemetry(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidJson(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Telemetry(err) => {
                let status = match &err {
                    TelemetryError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
                    TelemetryError::StoreUnavailable(_) => {
                        error!(error = %err, "store request failed");
                        return reply(StatusCode::SERVICE_UNAVAILABLE, "store unavailable".to_string());
                    }
                    TelemetryError::StoreRejected(_) | TelemetryError::NotARecord { .. } => {
                        error!(error = %err, "store answered unexpectedly");
                        return reply(StatusCode::INTERNAL_SERVER_ERROR, "store error".to_string());
                    }
                    TelemetryError::UnparseableTimestamp { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };

        reply(status, message)
    }
}

fn reply(status: StatusCode, message: String) -> Response {
    let body = Json(json!({
        "status": "error",
        "message": message,
    }));

    (status, body).into_response()
}
