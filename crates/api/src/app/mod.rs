//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (store, directories, notifier)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Tenant/actor context is required on every route but /health.
    let scoped = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(
            crate::middleware::context_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
}
