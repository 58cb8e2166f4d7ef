use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::routes::paths;
use crate::server::MarketServer;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::plugins::list_plugins,
        crate::handlers::plugins::search_plugins,
        crate::handlers::plugins::get_plugin,
        crate::handlers::plugins::get_plugin_by_name,
        crate::handlers::plugins::upload_plugin,
        crate::handlers::plugins::save_plugin_config,
        crate::handlers::plugins::get_plugin_config,
        crate::handlers::plugins::delete_plugin,
        crate::handlers::plugins::download_version,
        crate::handlers::files::get_icon,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::error::ApiErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "plugins", description = "Plugin upload, browsing, configuration and download"),
        (name = "files", description = "Stored plugin files"),
    ),
    info(
        title = "NextMarket API",
        version = "1.0.0",
        description = "Plugin marketplace registry: ingests npm-style package archives, keeps versioned artifacts in object storage and serves the catalog.",
    ),
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub fn create_docs_routes() -> Router<MarketServer> {
    Router::new().route(
        paths::docs::OPENAPI_JSON,
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
