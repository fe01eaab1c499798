/// End-to-end tests against the self-hosted backend
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use petal_gallery::{
    auth::{guard::GuardExit, GuardState, Session, SessionGuard},
    backend::{
        local::{auth::hash_password, LocalBackend},
        Backend, ObjectStore, PhotoQuery, PhotoTable,
    },
    config::{BackendConfig, GalleryConfig, LoggingConfig, ServerConfig, ServiceConfig},
    gallery::{Category, DeleteOutcome, NewPhoto, ObjectUpload, Photo, SortOrder, WriteOutcome},
    server::build_router,
    AppContext, GalleryError, GalleryResult,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "bouquet-of-peonies";
const PUBLIC_URL: &str = "http://gallery.test";
const BOUNDARY: &str = "petal-boundary";

fn config(dir: &TempDir) -> ServerConfig {
    let data = dir.path().to_path_buf();
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            public_url: PUBLIC_URL.to_string(),
        },
        backend: BackendConfig::Local {
            database: data.join("gallery.sqlite"),
            objects_directory: data.join("objects"),
            data_directory: data,
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            jwt_secret: "an-integration-test-secret-of-32+chars".to_string(),
            session_ttl_secs: 3600,
        },
        gallery: GalleryConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
            json: false,
        },
    }
}

async fn local_backend(config: &ServerConfig) -> Backend {
    LocalBackend::open(&config.backend, &config.service.public_url)
        .await
        .unwrap()
        .into_backend()
}

async fn context(dir: &TempDir) -> AppContext {
    AppContext::new(config(dir)).await.unwrap()
}

async fn sign_in(ctx: &AppContext) -> Session {
    ctx.sessions.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap()
}

async fn publish(ctx: &AppContext, session: &Session, name: &str, category: Category) -> WriteOutcome {
    let path = format!("images/{}", name);
    ctx.store
        .publish(
            session,
            ObjectUpload {
                path: &path,
                data: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png",
            },
            name,
            category,
        )
        .await
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn multipart(category: &str, files: &[(&str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"category\"\r\n\r\n{}\r\n",
            BOUNDARY, category
        )
        .as_bytes(),
    );
    for (name, mime, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Object store whose removals always fail
struct FailingRemoval(Arc<dyn ObjectStore>);

#[async_trait]
impl ObjectStore for FailingRemoval {
    fn bucket(&self) -> &str {
        self.0.bucket()
    }

    async fn upload(&self, session: &Session, path: &str, data: Vec<u8>, mime_type: &str) -> GalleryResult<()> {
        self.0.upload(session, path, data, mime_type).await
    }

    fn public_url(&self, path: &str) -> String {
        self.0.public_url(path)
    }

    async fn remove(&self, _session: &Session, _paths: &[String]) -> GalleryResult<()> {
        Err(GalleryError::Storage("bucket is read-only".to_string()))
    }

    async fn read(&self, path: &str) -> GalleryResult<Option<Vec<u8>>> {
        self.0.read(path).await
    }
}

/// Photo table whose count queries always fail
struct FailingCount(Arc<dyn PhotoTable>);

#[async_trait]
impl PhotoTable for FailingCount {
    async fn select(&self, session: Option<&Session>, query: &PhotoQuery) -> GalleryResult<Vec<Photo>> {
        self.0.select(session, query).await
    }

    async fn count(
        &self,
        _session: Option<&Session>,
        _created_since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64> {
        Err(GalleryError::Backend {
            status: 503,
            message: "count unavailable".to_string(),
        })
    }

    async fn insert(&self, session: &Session, photo: &NewPhoto) -> GalleryResult<Photo> {
        self.0.insert(session, photo).await
    }

    async fn delete(&self, session: &Session, id: &str) -> GalleryResult<()> {
        self.0.delete(session, id).await
    }
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let app = build_router(context(&dir).await);

    let (status, _, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
}

#[tokio::test]
async fn test_guarded_routes_redirect_to_login() {
    let dir = TempDir::new().unwrap();
    let app = build_router(context(&dir).await);

    for uri in ["/admin/dashboard", "/admin/photos", "/admin/session/events"] {
        let (status, headers, _) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(headers[header::LOCATION], "/admin/login");
    }

    let (status, headers, _) = send(&app, get("/admin/dashboard", Some("forged"))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/admin/login");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let dir = TempDir::new().unwrap();
    let app = build_router(context(&dir).await);

    let request = Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"email": ADMIN_EMAIL, "password": "wrong"}).to_string(),
        ))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "AuthenticationRequired");

    let request = Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"email": "nope", "password": "x"}).to_string(),
        ))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_serve_and_delete_over_http() {
    let dir = TempDir::new().unwrap();
    let app = build_router(context(&dir).await);

    let request = Request::builder()
        .method("POST")
        .uri("/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}).to_string(),
        ))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let token = json(&body)["access_token"].as_str().unwrap().to_string();

    let png = vec![7u8; 2 * 1024 * 1024];
    let big_jpeg = vec![1u8; 6 * 1024 * 1024];
    let request = Request::builder()
        .method("POST")
        .uri("/admin/photos")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart(
            "wedding",
            &[
                ("vows.png", "image/png", png.clone()),
                ("huge.jpg", "image/jpeg", big_jpeg),
            ],
        )))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let upload = json(&body);
    assert_eq!(upload["succeeded"], 1);
    assert_eq!(upload["failed"], 1);
    assert_eq!(upload["message"], "Successfully uploaded 1 photo(s)!");
    assert_eq!(upload["storage"]["used_mb"], 1.5);
    assert_eq!(upload["listing"]["total_items"], 1);

    let (status, _, body) = send(&app, get("/api/gallery?category=wedding", None)).await;
    assert_eq!(status, StatusCode::OK);
    let page = json(&body);
    assert_eq!(page["total_items"], 1);
    let photo = &page["photos"][0];
    let file_path = photo["file_path"].as_str().unwrap().to_string();
    assert_eq!(
        photo["image_url"].as_str().unwrap(),
        format!("{}/media/{}", PUBLIC_URL, file_path)
    );
    assert_eq!(photo["category"], "wedding");
    assert_eq!(photo["file_name"], "vows.png");

    let (status, _, body) = send(&app, get("/api/gallery?category=car", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["total_items"], 0);

    let media_uri = format!("/media/{}", file_path);
    let (status, headers, body) = send(&app, get(&media_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(body.len(), png.len());

    let id = photo["id"].as_str().unwrap().to_string();
    let (status, _, body) = send(&app, post(&format!("/admin/photos/{}/delete", id), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["state"], "confirm_pending");

    let (status, _, body) = send(&app, post("/admin/photos/delete/cancel", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["state"], "idle");

    send(&app, post(&format!("/admin/photos/{}/delete", id), &token)).await;
    let (status, _, body) = send(&app, post("/admin/photos/delete/confirm", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let deleted = json(&body);
    assert_eq!(deleted["outcome"], "committed");
    assert_eq!(deleted["message"], "Photo deleted successfully!");
    assert_eq!(deleted["listing"]["total_items"], 0);

    let (_, _, body) = send(&app, get("/api/gallery", None)).await;
    assert_eq!(json(&body)["total_items"], 0);
    let (status, _, _) = send(&app, get(&media_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination_over_ten_rows() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;

    for i in 1..=10 {
        publish(&ctx, &session, &format!("{:02}.png", i), Category::Stage).await;
    }
    let app = build_router(ctx);

    let (status, _, body) = send(&app, get("/api/gallery?order=oldest", None)).await;
    assert_eq!(status, StatusCode::OK);
    let first = json(&body);
    assert_eq!(first["total_pages"], 2);
    assert_eq!(first["photos"].as_array().unwrap().len(), 8);
    assert_eq!(first["photos"][0]["file_name"], "01.png");
    assert_eq!(first["has_prev"], false);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["scroll_to_top"], false);

    let (_, _, body) = send(&app, get("/api/gallery?order=oldest&page=2", None)).await;
    let second = json(&body);
    let names: Vec<&str> = second["photos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["file_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["09.png", "10.png"]);
    assert_eq!(second["has_next"], false);
    assert_eq!(second["scroll_to_top"], true);

    let (status, _, _) = send(&app, get("/api/gallery?page=3", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, get("/api/gallery?category=spaceship", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_latest_teaser_is_six_newest() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;
    for i in 1..=9 {
        publish(&ctx, &session, &format!("{}.png", i), Category::Baby).await;
    }
    let app = build_router(ctx);

    let (_, _, body) = send(&app, get("/api/gallery/latest", None)).await;
    let photos = json(&body)["photos"].as_array().unwrap().clone();
    assert_eq!(photos.len(), 6);
    assert_eq!(photos[0]["file_name"], "9.png");
}

#[tokio::test]
async fn test_failed_object_removal_keeps_photo_listed() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let mut backend = local_backend(&config).await;
    backend.objects = Arc::new(FailingRemoval(backend.objects.clone()));
    let ctx = AppContext::with_backend(config, backend);
    let session = sign_in(&ctx).await;

    let WriteOutcome::Committed(photo) = publish(&ctx, &session, "keep.png", Category::Car).await else {
        panic!("publish should commit");
    };

    ctx.deletions.request(&session, &photo.id).await.unwrap();
    let result = ctx.deletions.confirm(&ctx.store, &session).await;
    assert!(matches!(result, Err(GalleryError::Storage(_))));

    let listed = ctx.store.list_photos(SortOrder::NewestFirst).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, photo.id);
}

#[tokio::test]
async fn test_committed_writes_survive_failed_storage_refresh() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let mut backend = local_backend(&config).await;
    backend.photos = Arc::new(FailingCount(backend.photos.clone()));
    let ctx = AppContext::with_backend(config, backend);
    let session = sign_in(&ctx).await;
    let store = ctx.store.clone();
    let app = build_router(ctx);

    let request = Request::builder()
        .method("POST")
        .uri("/admin/photos")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.access_token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart(
            "birthday",
            &[("balloons.png", "image/png", vec![3u8; 1024])],
        )))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let upload = json(&body);
    assert_eq!(upload["succeeded"], 1);
    assert_eq!(upload["message"], "Successfully uploaded 1 photo(s)!");
    assert!(upload["storage"].is_null());
    assert_eq!(upload["listing"]["total_items"], 1);

    let listed = store.list_photos(SortOrder::NewestFirst).await.unwrap();
    assert_eq!(listed.len(), 1);

    let token = session.access_token.as_str();
    send(&app, post(&format!("/admin/photos/{}/delete", listed[0].id), token)).await;
    let (status, _, body) = send(&app, post("/admin/photos/delete/confirm", token)).await;
    assert_eq!(status, StatusCode::OK);
    let deleted = json(&body);
    assert_eq!(deleted["outcome"], "committed");
    assert!(deleted["storage"].is_null());
    assert_eq!(deleted["listing"]["total_items"], 0);
    assert!(store.list_photos(SortOrder::NewestFirst).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_outcome_committed_on_local_backend() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;

    let WriteOutcome::Committed(photo) = publish(&ctx, &session, "gone.png", Category::Other).await else {
        panic!("publish should commit");
    };
    let outcome = ctx.store.unpublish(&session, &photo).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Committed);
    assert_eq!(ctx.store.read_object("images/gone.png").await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_out_ends_mounted_guard() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;

    let GuardState::Active(mut guard) = SessionGuard::mount(&ctx.sessions, Some(&session.access_token)).await
    else {
        panic!("live session should mount");
    };

    ctx.sessions.sign_out(&session).await.unwrap();
    assert_eq!(guard.wait_for_exit().await, GuardExit::SignedOut);
    drop(guard);

    assert!(matches!(
        SessionGuard::mount(&ctx.sessions, Some(&session.access_token)).await,
        GuardState::Redirect
    ));
}

#[tokio::test]
async fn test_logout_over_http_kills_token() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;
    let app = build_router(ctx);

    let (status, _, _) = send(&app, get("/admin/dashboard", Some(&session.access_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, post("/admin/logout", &session.access_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, get("/admin/dashboard", Some(&session.access_token))).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_dashboard_reports_counts_and_storage() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;
    publish(&ctx, &session, "a.png", Category::Wedding).await;
    publish(&ctx, &session, "b.png", Category::Wedding).await;
    publish(&ctx, &session, "c.png", Category::Corporate).await;
    let app = build_router(ctx);

    let (status, _, body) = send(&app, get("/admin/dashboard", Some(&session.access_token))).await;
    assert_eq!(status, StatusCode::OK);
    let dashboard = json(&body);
    assert_eq!(dashboard["stats"]["total_photos"], 3);
    assert_eq!(dashboard["stats"]["this_month"], 3);
    assert_eq!(dashboard["storage"]["used_mb"], 4.5);
    assert_eq!(dashboard["storage"]["level"], "normal");
    assert_eq!(dashboard["pending_delete"]["state"], "idle");

    let wedding = dashboard["stats"]["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["category"] == "wedding")
        .unwrap()
        .clone();
    assert_eq!(wedding["count"], 2);
    assert_eq!(wedding["label"], "Wedding Decoration");
}

#[tokio::test]
async fn test_admin_search_filters_by_file_name() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir).await;
    let session = sign_in(&ctx).await;
    publish(&ctx, &session, "Rose-Arch.png", Category::Wedding).await;
    publish(&ctx, &session, "balloons.png", Category::Birthday).await;
    let app = build_router(ctx);

    let (status, _, body) = send(
        &app,
        get("/admin/photos?search=rose", Some(&session.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listing = json(&body);
    assert_eq!(listing["total_items"], 1);
    assert_eq!(listing["photos"][0]["file_name"], "Rose-Arch.png");
}
