/// Object serving for stores that keep their bytes locally
use crate::{
    context::AppContext,
    error::{GalleryError, GalleryResult},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};

/// Object names are never reused, so responses can be cached for a long time
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/media/*path", get(get_media))
}

/// Serve an object with content type, ETag and single-range support
async fn get_media(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> GalleryResult<Response> {
    let data = ctx
        .store
        .read_object(&path)
        .await?
        .ok_or_else(|| GalleryError::NotFound(format!("Object not found: {}", path)))?;

    let mime_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let etag = format!("\"{}\"", path);
    let total_size = data.len();

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == etag)
        .unwrap_or(false);
    if not_modified {
        return build(
            Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, etag)
                .header(header::CACHE_CONTROL, CACHE_CONTROL),
            Body::empty(),
        );
    }

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, total_size));

    if let Some((start, end)) = range {
        return build(
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, mime_type)
                .header(header::CONTENT_LENGTH, (end - start + 1).to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, total_size),
                )
                .header(header::ETAG, etag)
                .header(header::CACHE_CONTROL, CACHE_CONTROL)
                .header(header::ACCEPT_RANGES, "bytes"),
            Body::from(data[start..=end].to_vec()),
        );
    }

    build(
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, total_size.to_string())
            .header(header::ETAG, etag)
            .header(header::CACHE_CONTROL, CACHE_CONTROL)
            .header(header::ACCEPT_RANGES, "bytes"),
        Body::from(data),
    )
}

fn build(builder: axum::http::response::Builder, body: Body) -> GalleryResult<Response> {
    builder
        .body(body)
        .map_err(|e| GalleryError::Internal(format!("Failed to build response: {}", e)))
}

/// Inclusive byte range from a `Range: bytes=...` header
fn parse_range(value: &str, total_size: usize) -> Option<(usize, usize)> {
    if total_size == 0 {
        return None;
    }
    let ranges = value.trim().strip_prefix("bytes=")?;
    let (start, end) = ranges.split_once('-')?;

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500
        (true, false) => {
            let suffix: usize = end.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            Some((total_size.saturating_sub(suffix), total_size - 1))
        }
        // bytes=500-
        (false, true) => {
            let start: usize = start.parse().ok()?;
            (start < total_size).then_some((start, total_size - 1))
        }
        (false, false) => {
            let start: usize = start.parse().ok()?;
            let end = end.parse::<usize>().ok()?.min(total_size - 1);
            (start <= end).then_some((start, end))
        }
        (true, true) => None,
    }
}
