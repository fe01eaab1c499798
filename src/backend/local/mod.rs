/// Self-hosted backend
///
/// SQLite for the photo table, plain files for objects and a single
/// config-defined admin account.

pub mod auth;
pub mod db;
pub mod objects;
pub mod table;

pub use auth::LocalAuth;
pub use objects::{DiskObjectStore, MEDIA_BUCKET};
pub use table::SqlitePhotoTable;

use crate::{
    backend::Backend,
    config::BackendConfig,
    error::{GalleryError, GalleryResult},
};
use std::sync::Arc;

pub struct LocalBackend {
    pub auth: Arc<LocalAuth>,
    pub objects: Arc<DiskObjectStore>,
    pub photos: Arc<SqlitePhotoTable>,
}

impl LocalBackend {
    /// Open the database, run migrations and prepare the object directory
    pub async fn open(config: &BackendConfig, public_url: &str) -> GalleryResult<Self> {
        let BackendConfig::Local {
            data_directory,
            database,
            objects_directory,
            admin_email,
            admin_password_hash,
            jwt_secret,
            session_ttl_secs,
        } = config
        else {
            return Err(GalleryError::Internal(
                "Local backend opened with a non-local configuration".to_string(),
            ));
        };

        for dir in [data_directory, objects_directory] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                GalleryError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        let pool = db::create_pool(database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        Ok(Self {
            auth: Arc::new(LocalAuth::new(
                admin_email,
                admin_password_hash,
                jwt_secret,
                *session_ttl_secs,
            )),
            objects: Arc::new(DiskObjectStore::new(objects_directory.clone(), public_url)),
            photos: Arc::new(SqlitePhotoTable::new(pool)),
        })
    }

    pub fn into_backend(self) -> Backend {
        Backend {
            auth: self.auth,
            objects: self.objects,
            photos: self.photos,
        }
    }
}
