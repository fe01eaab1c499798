/// Admin endpoints: login, dashboard, photo manager
///
/// Everything except login sits behind the `AdminSession` extractor, which
/// redirects to the login view when there is no live session.
use crate::{
    api::gallery::{load_page, load_view},
    auth::{AdminSession, Session},
    context::AppContext,
    error::{GalleryError, GalleryResult},
    gallery::{
        stats::{self, DashboardStats, StorageUsage},
        upload::DEFAULT_CATEGORY,
        Category, DeleteOutcome, DeletionSlot, Page, SortOrder, UploadCandidate, UploadReport,
        UploadWorkflow,
    },
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// Whole-request ceiling for a multipart batch; single files are checked
/// against the per-file limit individually
const MAX_BATCH_REQUEST_BYTES: usize = 100 * 1024 * 1024;

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/login", get(login_required).post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/dashboard", get(dashboard))
        .route(
            "/admin/photos",
            get(list_photos)
                .post(upload_photos)
                .layer(DefaultBodyLimit::max(MAX_BATCH_REQUEST_BYTES)),
        )
        .route("/admin/photos/:id/delete", post(request_delete))
        .route("/admin/photos/delete/cancel", post(cancel_delete))
        .route("/admin/photos/delete/confirm", post(confirm_delete))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Where guarded routes send clients without a session
async fn login_required() -> GalleryError {
    GalleryError::Authentication("Sign in to continue".to_string())
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> GalleryResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| GalleryError::Validation(e.to_string()))?;

    let session = ctx.sessions.sign_in(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        access_token: session.access_token,
        user_id: session.user_id,
        email: session.email,
        expires_at: session.expires_at,
    }))
}

async fn logout(
    State(ctx): State<AppContext>,
    admin: AdminSession,
) -> GalleryResult<Json<MessageResponse>> {
    ctx.deletions.clear(admin.session()).await;
    ctx.sessions.sign_out(admin.session()).await?;

    Ok(Json(MessageResponse {
        message: "Signed out".to_string(),
    }))
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    stats: DashboardStats,
    storage: StorageUsage,
    pending_delete: DeletionSlot,
}

async fn dashboard(
    State(ctx): State<AppContext>,
    admin: AdminSession,
) -> GalleryResult<Json<DashboardResponse>> {
    let session = admin.session();
    let stats = stats::dashboard_stats(&ctx.store, session).await?;
    let storage = stats::StorageUsage::estimate(stats.total_photos, ctx.config.gallery.storage_limit_mb);

    Ok(Json(DashboardResponse {
        stats,
        storage,
        pending_delete: ctx.deletions.slot(session).await,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ManagerQuery {
    category: Option<String>,
    search: Option<String>,
    order: Option<SortOrder>,
    page: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ManagerResponse {
    #[serde(flatten)]
    page: Page,
    pending_delete: DeletionSlot,
}

async fn list_photos(
    State(ctx): State<AppContext>,
    admin: AdminSession,
    Query(query): Query<ManagerQuery>,
) -> GalleryResult<Json<ManagerResponse>> {
    let page = load_page(
        &ctx,
        query.category.as_deref(),
        query.search.as_deref(),
        query.order,
        query.page,
    )
    .await?;

    Ok(Json(ManagerResponse {
        page,
        pending_delete: ctx.deletions.slot(admin.session()).await,
    }))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    #[serde(flatten)]
    report: UploadReport,
    /// `None` when the re-estimate failed after the batch was written
    storage: Option<StorageUsage>,
    /// Freshly fetched first page of the manager listing
    listing: Option<Page>,
}

/// Multipart batch upload: an optional `category` field plus any number of files
async fn upload_photos(
    State(ctx): State<AppContext>,
    admin: AdminSession,
    mut multipart: Multipart,
) -> GalleryResult<Json<UploadResponse>> {
    let mut category = DEFAULT_CATEGORY;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GalleryError::Validation(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() == Some("category") {
            let value = field
                .text()
                .await
                .map_err(|e| GalleryError::Validation(format!("Multipart error: {}", e)))?;
            category = value.trim().parse::<Category>()?;
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream().to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GalleryError::Validation(format!("Multipart error: {}", e)))?;

        files.push(UploadCandidate::new(file_name, mime_type, bytes.to_vec()));
    }

    let session = admin.session();
    let report = UploadWorkflow::new(&ctx.store, &ctx.config.gallery)
        .run(session, category, files)
        .await?;

    let storage = refresh_storage(&ctx, session).await;
    let listing = load_page(&ctx, None, None, None, None)
        .await
        .map_err(|e| warn!("Failed to refresh manager listing after upload: {}", e))
        .ok();

    Ok(Json(UploadResponse {
        message: report.message(),
        report,
        storage,
        listing,
    }))
}

async fn request_delete(
    State(ctx): State<AppContext>,
    admin: AdminSession,
    Path(id): Path<String>,
) -> GalleryResult<Json<DeletionSlot>> {
    let slot = ctx.deletions.request(admin.session(), &id).await?;
    Ok(Json(slot))
}

async fn cancel_delete(
    State(ctx): State<AppContext>,
    admin: AdminSession,
) -> Json<DeletionSlot> {
    ctx.deletions.cancel(admin.session()).await;
    Json(ctx.deletions.slot(admin.session()).await)
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    message: String,
    #[serde(flatten)]
    outcome: DeleteOutcome,
    storage: Option<StorageUsage>,
    /// First page of the manager listing with the deleted photo dropped
    listing: Option<Page>,
}

async fn confirm_delete(
    State(ctx): State<AppContext>,
    admin: AdminSession,
) -> GalleryResult<Json<DeleteResponse>> {
    let session = admin.session();
    let pending = ctx.deletions.slot(session).await.pending().map(str::to_string);
    let view = load_view(&ctx, None, None, None)
        .await
        .map_err(|e| warn!("Failed to load manager listing before delete: {}", e))
        .ok();

    let outcome = ctx.deletions.confirm(&ctx.store, session).await?;

    let message = match &outcome {
        DeleteOutcome::Committed => "Photo deleted successfully!".to_string(),
        DeleteOutcome::RowOrphaned { error, .. } => {
            format!("Photo file removed but its record could not be deleted: {}", error)
        }
    };
    let storage = refresh_storage(&ctx, session).await;
    let listing = view.map(|mut view| {
        if let (DeleteOutcome::Committed, Some(id)) = (&outcome, pending.as_deref()) {
            view.remove(id);
        }
        view.take_page()
    });

    Ok(Json(DeleteResponse {
        message,
        outcome,
        storage,
        listing,
    }))
}

/// Storage estimate after a write; the write already happened, so a failed
/// count is logged and left out of the response
async fn refresh_storage(ctx: &AppContext, session: &Session) -> Option<StorageUsage> {
    stats::storage_usage(&ctx.store, session, ctx.config.gallery.storage_limit_mb)
        .await
        .map_err(|e| warn!("Failed to refresh storage usage: {}", e))
        .ok()
}
