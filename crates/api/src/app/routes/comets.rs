use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use astro_core::{CometId, CometSubmission};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(get_all_comets_calculation).post(create_comet_calculation),
        )
        .route(
            "/:id",
            get(get_comet_calculation).delete(delete_comet_observation),
        )
}

/// Responds with the computed characteristic only; the full aggregate is
/// available through the read endpoints.
pub async fn create_comet_calculation(
    Extension(services): Extension<AppServices>,
    body: Result<Json<dto::CreateCometCalculationRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .create_comet_calculation(CometSubmission::from(body))
        .await
    {
        Ok(comet) => (StatusCode::OK, Json(comet.characteristic().clone())).into_response(),
        Err(e) => errors::calculation_error_to_response(e),
    }
}

pub async fn get_all_comets_calculation(
    Extension(services): Extension<AppServices>,
) -> axum::response::Response {
    match services.get_all_comets_calculation().await {
        Ok(comets) => (StatusCode::OK, Json(comets)).into_response(),
        Err(e) => errors::calculation_error_to_response(e),
    }
}

pub async fn get_comet_calculation(
    Extension(services): Extension<AppServices>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_comet_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_comet_calculation(id).await {
        Ok(comet) => (StatusCode::OK, Json(comet)).into_response(),
        Err(e) => errors::calculation_error_to_response(e),
    }
}

pub async fn delete_comet_observation(
    Extension(services): Extension<AppServices>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_comet_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_comet_observation(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::calculation_error_to_response(e),
    }
}

fn parse_comet_id(raw: &str) -> Result<CometId, axum::response::Response> {
    raw.parse::<CometId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid comet id"))
}
