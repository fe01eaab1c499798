/// Remote backend seams
///
/// The gallery talks to three independently failing services: an auth
/// provider, a bucket-based object store and the `gallery_photos` table.
/// Each sits behind its own trait so the hosted and self-hosted
/// implementations can be swapped, and so tests can inject failures.

pub mod local;
pub mod supabase;

use crate::{
    auth::Session,
    config::{BackendConfig, ServerConfig},
    error::GalleryResult,
    gallery::{listing::SortOrder, Category, NewPhoto, Photo},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Authentication provider
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange email + password for a session
    async fn sign_in(&self, email: &str, password: &str) -> GalleryResult<Session>;

    /// Invalidate a session
    async fn sign_out(&self, session: &Session) -> GalleryResult<()>;

    /// Look up the session behind an access token, `None` if it is not live
    async fn get_session(&self, access_token: &str) -> GalleryResult<Option<Session>>;
}

/// Bucket-based binary storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name; public URLs always contain `/{bucket}/{path}`
    fn bucket(&self) -> &str;

    /// Write an object. Existing objects are never overwritten.
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> GalleryResult<()>;

    /// Public URL for an object key
    fn public_url(&self, path: &str) -> String;

    /// Remove objects by key
    async fn remove(&self, session: &Session, paths: &[String]) -> GalleryResult<()>;

    /// Read an object back for serving. Stores whose public URLs point
    /// elsewhere never serve through us.
    async fn read(&self, _path: &str) -> GalleryResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Row filter for photo listings
#[derive(Debug, Clone, Default)]
pub struct PhotoQuery {
    /// Single row by primary key
    pub id: Option<String>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub category: Option<Category>,
    pub created_since: Option<DateTime<Utc>>,
}

/// The `gallery_photos` table
#[async_trait]
pub trait PhotoTable: Send + Sync {
    /// Select rows; reads without a session use anonymous access
    async fn select(&self, session: Option<&Session>, query: &PhotoQuery)
        -> GalleryResult<Vec<Photo>>;

    /// Count-only query
    async fn count(
        &self,
        session: Option<&Session>,
        created_since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64>;

    /// Insert a row and return it as stored
    async fn insert(&self, session: &Session, photo: &NewPhoto) -> GalleryResult<Photo>;

    /// Delete a row by id
    async fn delete(&self, session: &Session, id: &str) -> GalleryResult<()>;
}

/// The auth/storage/database triad
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthBackend>,
    pub objects: Arc<dyn ObjectStore>,
    pub photos: Arc<dyn PhotoTable>,
}

impl Backend {
    /// Build the backend selected by configuration
    pub async fn from_config(config: &ServerConfig) -> GalleryResult<Self> {
        match &config.backend {
            BackendConfig::Supabase {
                url,
                anon_key,
                bucket,
                table,
            } => {
                tracing::info!("Using hosted backend at {} (bucket: {})", url, bucket);
                let client = Arc::new(supabase::SupabaseClient::new(
                    url.clone(),
                    anon_key.clone(),
                    bucket.clone(),
                    table.clone(),
                )?);
                Ok(Self {
                    auth: client.clone(),
                    objects: client.clone(),
                    photos: client,
                })
            }
            BackendConfig::Local { .. } => {
                tracing::info!("Using local backend");
                local::LocalBackend::open(&config.backend, &config.service.public_url)
                    .await
                    .map(local::LocalBackend::into_backend)
            }
        }
    }
}
