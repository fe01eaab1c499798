/// Disk-based object store for the local backend
use crate::{
    auth::Session,
    backend::ObjectStore,
    error::{GalleryError, GalleryResult},
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Name of the pseudo-bucket; public URLs are `{base}/media/{key}`
pub const MEDIA_BUCKET: &str = "media";

/// Stores objects as plain files under `base_path`, keyed by their path
#[derive(Clone)]
pub struct DiskObjectStore {
    base_path: PathBuf,
    public_base: String,
}

impl DiskObjectStore {
    /// Create a new disk object store
    pub fn new(base_path: PathBuf, public_base: &str) -> Self {
        Self {
            base_path,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve an object key to a file, refusing anything that escapes the base
    fn object_file(&self, path: &str) -> GalleryResult<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(GalleryError::Validation(format!(
                "Invalid object path: {}",
                path
            )));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    fn bucket(&self) -> &str {
        MEDIA_BUCKET
    }

    async fn upload(
        &self,
        _session: &Session,
        path: &str,
        data: Vec<u8>,
        _mime_type: &str,
    ) -> GalleryResult<()> {
        let file = self.object_file(path)?;

        if fs::try_exists(&file).await? {
            return Err(GalleryError::Storage(format!(
                "Object already exists: {}",
                path
            )));
        }

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                GalleryError::Storage(format!("Failed to create object directory: {}", e))
            })?;
        }

        fs::write(&file, data)
            .await
            .map_err(|e| GalleryError::Storage(format!("Failed to write object {}: {}", path, e)))?;

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, MEDIA_BUCKET, path)
    }

    async fn remove(&self, _session: &Session, paths: &[String]) -> GalleryResult<()> {
        for path in paths {
            let file = self.object_file(path)?;
            match fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("Object {} already gone", path);
                }
                Err(e) => {
                    return Err(GalleryError::Storage(format!(
                        "Failed to remove object {}: {}",
                        path, e
                    )))
                }
            }
        }
        Ok(())
    }

    async fn read(&self, path: &str) -> GalleryResult<Option<Vec<u8>>> {
        let file = self.object_file(path)?;

        match fs::read(&file).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GalleryError::Storage(format!(
                "Failed to read object {}: {}",
                path, e
            ))),
        }
    }
}
