use crate::AppState;
use crate::error::HttpError;
use axum::Json;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use comicglass_cache::CacheStats;
use comicglass_storage::resolve_path;
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IndexQuery {
    #[serde(default)]
    path: String,
}

/// `GET /?path=<relative directory>`
#[instrument(skip_all, fields(path = %query.path))]
pub(crate) async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, HttpError> {
    let requested = query.path.trim();
    let dir = resolve_path(&state.root, requested).map_err(|err| {
        tracing::debug!(error = ?err, "Rejected requested path");
        HttpError::PathDoesNotExist
    })?;
    let listing = state.cache.get_listing(&dir).await?;
    let label = match requested {
        "" | "." => "./",
        requested => requested,
    };
    let html = state.page.render(label, &state.root, &listing, state.order)?;
    Ok(Html(html))
}

/// `GET /.cache`
pub(crate) async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Everything else: a file from the library root, or 404.
///
/// Directories are never served, with or without a trailing slash; they are
/// only reachable through the index page.
#[instrument(skip_all, fields(uri = %request.uri()))]
pub(crate) async fn library_file(State(state): State<AppState>, request: Request) -> Response {
    let Ok(requested) = urlencoding::decode(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let requested = requested.trim_start_matches('/');
    if requested.trim().is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Ok(path) = resolve_path(&state.root, requested) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {},
        _ => return StatusCode::NOT_FOUND.into_response(),
    }
    tracing::trace!(path = %path.display(), "Serving library file");
    // Infallible: ServeFile turns I/O failures into responses itself.
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
