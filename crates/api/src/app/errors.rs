use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use astro_infra::calculation::CalculationError;

pub fn calculation_error_to_response(err: CalculationError) -> axum::response::Response {
    match err {
        CalculationError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        CalculationError::NotFound(id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("comet {id} not found"),
        ),
        CalculationError::ComputationFailed { status, body } => json_error(
            StatusCode::BAD_GATEWAY,
            "computation_failed",
            format!("orbit computation service answered with status {status}: {body}"),
        ),
        CalculationError::Decoding(msg) => {
            json_error(StatusCode::BAD_GATEWAY, "computation_decoding_error", msg)
        }
        CalculationError::ComputationUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "computation_unavailable", msg)
        }
        CalculationError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
        CalculationError::Persistence(msg) => {
            tracing::error!(error = %msg, "persistence failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg)
        }
    }
}

/// Any body the JSON extractor refuses is caller error.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
