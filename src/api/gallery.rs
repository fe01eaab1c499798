/// Public gallery endpoints
use crate::{
    context::AppContext,
    error::GalleryResult,
    gallery::{CategoryFilter, GalleryView, Page, Photo, SortOrder},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build gallery routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/gallery", get(list_gallery))
        .route("/api/gallery/latest", get(latest_photos))
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    pub category: Option<String>,
    pub page: Option<usize>,
    pub order: Option<SortOrder>,
}

/// Filtered view over a fresh listing, on page 1
pub(crate) async fn load_view(
    ctx: &AppContext,
    category: Option<&str>,
    search: Option<&str>,
    order: Option<SortOrder>,
) -> GalleryResult<GalleryView> {
    let filter: CategoryFilter = category.unwrap_or("all").parse()?;
    let photos = ctx.store.list_photos(order.unwrap_or_default()).await?;

    let mut view = GalleryView::new(ctx.config.gallery.page_size);
    view.replace(photos);
    view.set_category(filter);
    if let Some(search) = search {
        view.set_search(search);
    }
    Ok(view)
}

/// Filtered, paginated view over a fresh listing
pub(crate) async fn load_page(
    ctx: &AppContext,
    category: Option<&str>,
    search: Option<&str>,
    order: Option<SortOrder>,
    page: Option<usize>,
) -> GalleryResult<Page> {
    let mut view = load_view(ctx, category, search, order).await?;
    view.select_page(page.unwrap_or(1))?;
    Ok(view.take_page())
}

/// Full gallery, one page at a time
async fn list_gallery(
    State(ctx): State<AppContext>,
    Query(query): Query<GalleryQuery>,
) -> GalleryResult<Json<Page>> {
    let page = load_page(
        &ctx,
        query.category.as_deref(),
        None,
        query.order,
        query.page,
    )
    .await?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
struct LatestResponse {
    photos: Vec<Photo>,
}

/// Home page teaser
async fn latest_photos(State(ctx): State<AppContext>) -> GalleryResult<Json<LatestResponse>> {
    let photos = ctx
        .store
        .latest_photos(ctx.config.gallery.teaser_limit)
        .await?;
    Ok(Json(LatestResponse { photos }))
}
