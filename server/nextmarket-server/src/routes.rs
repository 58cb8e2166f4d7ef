use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{files, health, plugins},
    openapi,
    server::MarketServer,
};

pub mod paths;

/// Create health check routes
pub fn health_routes() -> Router<MarketServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Create plugin registry routes
pub fn plugin_routes() -> Router<MarketServer> {
    Router::new()
        .route(paths::plugins::PLUGINS, get(plugins::list_plugins))
        .route(paths::plugins::SEARCH, get(plugins::search_plugins))
        .route(paths::plugins::UPLOAD, post(plugins::upload_plugin))
        .route(
            paths::plugins::BY_ID,
            get(plugins::get_plugin).delete(plugins::delete_plugin),
        )
        .route(paths::plugins::BY_NAME, get(plugins::get_plugin_by_name))
        .route(
            paths::plugins::CONFIG,
            post(plugins::save_plugin_config).get(plugins::get_plugin_config),
        )
        .route(paths::plugins::DOWNLOAD, get(plugins::download_version))
}

/// Create stored file routes
pub fn file_routes() -> Router<MarketServer> {
    Router::new().route(paths::files::ICON, get(files::get_icon))
}

/// Create all application routes
pub fn create_routes() -> Router<MarketServer> {
    Router::new()
        .merge(health_routes())
        .nest(
            paths::API_V1,
            Router::new().merge(plugin_routes()).merge(file_routes()),
        )
        .merge(openapi::create_docs_routes())
}
