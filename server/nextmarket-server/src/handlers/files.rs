use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{error::ApiResult, server::MarketServer};

/// Serve a plugin icon stored under `icons/`
#[utoipa::path(
    get,
    path = "/api/v1/files/icons/{file}",
    params(("file" = String, Path, description = "Icon file name, e.g. `weather-widget.png`")),
    responses(
        (status = 200, description = "Icon bytes"),
        (status = 400, description = "Path escapes the icon directory"),
        (status = 404, description = "No such icon")
    ),
    tag = "files"
)]
pub async fn get_icon(
    State(server): State<MarketServer>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(file) = path?;
    let object = server.service.fetch_icon(&file).await?;

    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        object.data,
    )
        .into_response())
}
