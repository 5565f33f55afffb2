use axum::Router;

pub mod comets;
pub mod system;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new().nest("/cometCalculation", comets::router())
}
