//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage backend and computation client wiring
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and their mapping to core types
//! - `errors.rs`: consistent error responses

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services, in_memory_services};

/// Build the full HTTP router around an already wired calculation service.
pub fn build_app(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(services)),
        )
}
