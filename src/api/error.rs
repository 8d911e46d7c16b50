//! HTTP response conversion for [`crate::WorkflowError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::WorkflowError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Thin wrapper so the API layer can implement `IntoResponse` for an error
/// type it doesn't own.
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: String,
    message: String,
    #[serde(rename = "retryAfterMs", skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let retry_after_ms = match &self.0 {
            WorkflowError::AssemblyInProgress { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            code: self.0.code().to_string(),
            message: self.0.to_string(),
            retry_after_ms,
        };

        if status.is_server_error() {
            tracing::error!(code = body.code, message = %body.message, "request failed");
        } else {
            tracing::warn!(code = body.code, message = %body.message, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError(WorkflowError::NotFound("workflow x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn assembly_in_progress_maps_to_202() {
        let resp = ApiError(WorkflowError::AssemblyInProgress {
            assembly_id: "a1".into(),
            retry_after_ms: 1500,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn assembly_in_progress_body_carries_retry_after_ms() {
        let body = ErrorBody {
            success: false,
            code: "ASSEMBLY_IN_PROGRESS".into(),
            message: "assembly 'a1' is still in progress".into(),
            retry_after_ms: Some(1500),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["retryAfterMs"], serde_json::json!(1500));
    }

    #[test]
    fn other_errors_omit_retry_after_ms() {
        let body = ErrorBody { success: false, code: "NOT_FOUND".into(), message: "x".into(), retry_after_ms: None };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("retryAfterMs").is_none());
    }
}
