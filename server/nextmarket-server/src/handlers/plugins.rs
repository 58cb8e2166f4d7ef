//! Plugin registry endpoints

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    Json,
};
use plugins_registry_api::{
    ConfigDocument, DownloadLink, Page, PluginDetail, PluginId, PluginTier, UploadOutcome,
};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{api_message, api_success, ApiError, ApiResponse, ApiResult},
    server::MarketServer,
    types::{ListPluginsParams, SearchParams, VersionQuery},
};

/// Multipart field carrying the package archive
pub const UPLOAD_FIELD: &str = "file";

fn parse_tier(raw: Option<&str>) -> ApiResult<Option<PluginTier>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Unknown plugin type '{text}'"))),
    }
}

/// List plugins, optionally filtered by tier
#[utoipa::path(
    get,
    path = "/api/v1/plugins",
    params(ListPluginsParams),
    responses(
        (status = 200, description = "Page of plugins with their publisher"),
        (status = 400, description = "Unknown plugin type or malformed paging")
    ),
    tag = "plugins"
)]
pub async fn list_plugins(
    State(server): State<MarketServer>,
    query: Result<Query<ListPluginsParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Page<PluginDetail>>> {
    let Query(params) = query?;
    let tier = parse_tier(params.tier.as_deref())?;
    let page = server
        .service
        .list_plugins(params.pagination().page_request(), tier)
        .await?;
    Ok(api_success(page))
}

/// Case-insensitive substring search
#[utoipa::path(
    get,
    path = "/api/v1/plugins/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Page of matching plugins"),
        (status = 400, description = "Missing keyword")
    ),
    tag = "plugins"
)]
pub async fn search_plugins(
    State(server): State<MarketServer>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Page<PluginDetail>>> {
    let Query(params) = query?;
    let keyword = params.q.clone().unwrap_or_default();
    if keyword.trim().is_empty() {
        return Err(ApiError::bad_request("Search keyword is required"));
    }
    let page = server
        .service
        .search_plugins(&keyword, params.pagination().page_request())
        .await?;
    Ok(api_success(page))
}

/// Plugin with publisher and versions
#[utoipa::path(
    get,
    path = "/api/v1/plugins/{id}",
    params(("id" = i64, Path, description = "Plugin id")),
    responses(
        (status = 200, description = "Plugin detail"),
        (status = 404, description = "Plugin not found")
    ),
    tag = "plugins"
)]
pub async fn get_plugin(
    State(server): State<MarketServer>,
    path: Result<Path<PluginId>, PathRejection>,
) -> ApiResult<ApiResponse<PluginDetail>> {
    let Path(id) = path?;
    Ok(api_success(server.service.get_plugin(id).await?))
}

/// Plugin by npm package name
#[utoipa::path(
    get,
    path = "/api/v1/plugins/by-name/{name}",
    params(("name" = String, Path, description = "npm package name, scoped names included")),
    responses(
        (status = 200, description = "Plugin detail"),
        (status = 404, description = "Plugin not found")
    ),
    tag = "plugins"
)]
pub async fn get_plugin_by_name(
    State(server): State<MarketServer>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<ApiResponse<PluginDetail>> {
    let Path(name) = path?;
    Ok(api_success(server.service.get_plugin_by_name(&name).await?))
}

/// Upload a package archive (`multipart/form-data`, field `file`)
#[utoipa::path(
    post,
    path = "/api/v1/plugins/upload",
    request_body(content_type = "multipart/form-data", description = "npm tarball in field `file`"),
    responses(
        (status = 200, description = "Plugin and version recorded"),
        (status = 400, description = "Malformed archive, version or schema"),
        (status = 413, description = "Archive exceeds the upload limit"),
        (status = 409, description = "Version already exists"),
        (status = 500, description = "Storage or database failure")
    ),
    tag = "plugins"
)]
pub async fn upload_plugin(
    State(server): State<MarketServer>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<UploadOutcome>> {
    let mut multipart = multipart?;
    let mut archive = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            archive = Some(field.bytes().await?);
            break;
        }
    }
    let archive = archive
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let publisher_id = server.service.resolve_publisher().await?;
    let outcome = server
        .service
        .upload_plugin(archive.to_vec(), publisher_id)
        .await?;

    info!(
        plugin = %outcome.plugin.npm_package_name,
        version = %outcome.version.version,
        pruned = outcome.pruned.len(),
        "Upload accepted"
    );
    Ok(api_success(outcome).with_message("Plugin uploaded successfully"))
}

fn require_version_id(query: &VersionQuery) -> ApiResult<i64> {
    query
        .version_id
        .ok_or_else(|| ApiError::bad_request("Invalid version ID"))
}

/// Validate and store configuration values for one version
#[utoipa::path(
    post,
    path = "/api/v1/plugins/{id}/config",
    params(("id" = i64, Path, description = "Plugin id"), VersionQuery),
    request_body(content_type = "application/json", description = "Configuration values keyed by field"),
    responses(
        (status = 200, description = "Configuration saved"),
        (status = 400, description = "Schema missing or values rejected"),
        (status = 404, description = "Plugin or version not found")
    ),
    tag = "plugins"
)]
pub async fn save_plugin_config(
    State(server): State<MarketServer>,
    path: Result<Path<PluginId>, PathRejection>,
    query: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Path(plugin_id) = path?;
    let Query(query) = query?;
    let version_id = require_version_id(&query)?;
    let Json(values) = body?;

    server
        .service
        .save_config(plugin_id, version_id, values)
        .await?;
    Ok(api_message("Configuration saved successfully"))
}

/// Stored schema and values of one version
#[utoipa::path(
    get,
    path = "/api/v1/plugins/{id}/config",
    params(("id" = i64, Path, description = "Plugin id"), VersionQuery),
    responses(
        (status = 200, description = "Schema and stored values"),
        (status = 404, description = "Plugin or version not found")
    ),
    tag = "plugins"
)]
pub async fn get_plugin_config(
    State(server): State<MarketServer>,
    path: Result<Path<PluginId>, PathRejection>,
    query: Result<Query<VersionQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<ConfigDocument>> {
    let Path(plugin_id) = path?;
    let Query(query) = query?;
    let version_id = require_version_id(&query)?;
    Ok(api_success(
        server.service.get_config(plugin_id, version_id).await?,
    ))
}

/// Permanently delete a plugin with all versions and stored files
#[utoipa::path(
    delete,
    path = "/api/v1/plugins/{id}",
    params(("id" = i64, Path, description = "Plugin id")),
    responses(
        (status = 200, description = "Plugin deleted"),
        (status = 404, description = "Plugin not found")
    ),
    tag = "plugins"
)]
pub async fn delete_plugin(
    State(server): State<MarketServer>,
    path: Result<Path<PluginId>, PathRejection>,
) -> ApiResult<ApiResponse<()>> {
    let Path(id) = path?;
    server.service.delete_plugin(id).await?;
    Ok(api_message("Plugin deleted successfully"))
}

/// Presigned download link for one version
#[utoipa::path(
    get,
    path = "/api/v1/plugins/{id}/versions/{version}/download",
    params(
        ("id" = i64, Path, description = "Plugin id"),
        ("version" = String, Path, description = "Semantic version")
    ),
    responses(
        (status = 200, description = "Time-limited artifact URL"),
        (status = 404, description = "Plugin or version not found")
    ),
    tag = "plugins"
)]
pub async fn download_version(
    State(server): State<MarketServer>,
    path: Result<Path<(PluginId, String)>, PathRejection>,
) -> ApiResult<ApiResponse<DownloadLink>> {
    let Path((id, version)) = path?;
    Ok(api_success(server.service.download(id, &version).await?))
}
