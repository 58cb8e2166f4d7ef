//! NextMarket Server - plugin marketplace registry API
//!
//! HTTP surface over [`plugins_registry_api::PluginService`], the S3
//! [`BlobStore`](plugins_registry_api::BlobStore) implementation and the
//! configuration the binary is started with.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::MarketConfig;
pub use error::*;
pub use server::MarketServer;

use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Create the main application router with all routes and middleware
pub fn create_app(server: MarketServer) -> Router {
    let max_body = server.settings.max_upload_bytes;
    let cors = middleware::create_cors_layer(&server.settings.cors_origins);

    routes::create_routes()
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(server)
}
