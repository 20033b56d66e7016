use axum::{
    Router,
    http::{HeaderName, header},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes;

pub type DeploymentImpl = deployment::Deployment;

/// Permissive CORS so the storefront can call the functions from any origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub fn router(deployment: DeploymentImpl) -> Router {
    Router::new()
        .merge(routes::gallery::router(&deployment))
        .merge(routes::batch::router(&deployment))
        .merge(routes::storage::router(&deployment))
        .route("/health", get(|| async { "ok" }))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
