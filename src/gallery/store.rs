/// Gallery store adapter
///
/// The one place that knows how a photo row maps onto a storage object.
/// Workflows call this, never the backend directly.
use crate::{
    auth::Session,
    backend::{Backend, ObjectStore, PhotoQuery, PhotoTable},
    error::{GalleryError, GalleryResult},
    gallery::{listing::SortOrder, Category, NewPhoto, Photo},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of the object-then-row write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Object stored and row inserted
    Committed(Photo),
    /// Object stored but the row insert failed; nothing references the object
    ObjectOrphaned { path: String, error: String },
}

/// Result of the object-then-row delete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Object and row both gone
    Committed,
    /// Object removed but the row delete failed; the row now dangles
    RowOrphaned { id: String, error: String },
}

/// Object key plus payload for a single write
#[derive(Debug, Clone)]
pub struct ObjectUpload<'a> {
    pub path: &'a str,
    pub data: Vec<u8>,
    pub mime_type: &'a str,
}

#[derive(Clone)]
pub struct GalleryStore {
    objects: Arc<dyn ObjectStore>,
    photos: Arc<dyn PhotoTable>,
}

impl GalleryStore {
    pub fn new(objects: Arc<dyn ObjectStore>, photos: Arc<dyn PhotoTable>) -> Self {
        Self { objects, photos }
    }

    pub fn from_backend(backend: &Backend) -> Self {
        Self::new(backend.objects.clone(), backend.photos.clone())
    }

    pub fn bucket(&self) -> &str {
        self.objects.bucket()
    }

    /// Every photo, ordered by `created_at`
    pub async fn list_photos(&self, order: SortOrder) -> GalleryResult<Vec<Photo>> {
        self.photos
            .select(
                None,
                &PhotoQuery {
                    order,
                    ..PhotoQuery::default()
                },
            )
            .await
    }

    /// One photo by id, `None` if no such row exists
    pub async fn find_photo(&self, id: &str) -> GalleryResult<Option<Photo>> {
        let rows = self
            .photos
            .select(
                None,
                &PhotoQuery {
                    id: Some(id.to_string()),
                    limit: Some(1),
                    ..PhotoQuery::default()
                },
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// The newest `limit` photos
    pub async fn latest_photos(&self, limit: usize) -> GalleryResult<Vec<Photo>> {
        self.photos
            .select(
                None,
                &PhotoQuery {
                    order: SortOrder::NewestFirst,
                    limit: Some(limit),
                    ..PhotoQuery::default()
                },
            )
            .await
    }

    /// Row count, optionally only rows created at or after `since`
    pub async fn count_photos(
        &self,
        session: Option<&Session>,
        since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64> {
        self.photos.count(session, since).await
    }

    pub async fn insert_photo(&self, session: &Session, photo: &NewPhoto) -> GalleryResult<Photo> {
        self.photos.insert(session, photo).await
    }

    pub async fn delete_photo(&self, session: &Session, id: &str) -> GalleryResult<()> {
        self.photos.delete(session, id).await
    }

    pub async fn upload_object(&self, session: &Session, upload: ObjectUpload<'_>) -> GalleryResult<()> {
        self.objects
            .upload(session, upload.path, upload.data, upload.mime_type)
            .await
    }

    pub async fn remove_object(&self, session: &Session, path: &str) -> GalleryResult<()> {
        self.objects.remove(session, &[path.to_string()]).await
    }

    pub fn public_url(&self, path: &str) -> String {
        self.objects.public_url(path)
    }

    pub async fn read_object(&self, path: &str) -> GalleryResult<Option<Vec<u8>>> {
        self.objects.read(path).await
    }

    /// Write the object, then insert the row that points at it
    ///
    /// An upload failure is an error and nothing was written. An insert
    /// failure is reported as `ObjectOrphaned`; the object is left in place.
    pub async fn publish(
        &self,
        session: &Session,
        upload: ObjectUpload<'_>,
        file_name: &str,
        category: Category,
    ) -> GalleryResult<WriteOutcome> {
        let path = upload.path.to_string();
        self.upload_object(session, upload).await?;

        let row = NewPhoto {
            image_url: self.public_url(&path),
            category,
            file_name: Some(file_name.to_string()),
            file_path: Some(path.clone()),
            alt_text: Some(file_name.to_string()),
        };

        match self.insert_photo(session, &row).await {
            Ok(photo) => {
                info!("Published photo {} at {}", photo.id, path);
                Ok(WriteOutcome::Committed(photo))
            }
            Err(e) => {
                warn!("Row insert failed after upload, object {} orphaned: {}", path, e);
                Ok(WriteOutcome::ObjectOrphaned {
                    path,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Remove the object, then delete the row
    ///
    /// If the object cannot be removed the row is untouched and the error is
    /// returned. A row delete failure afterwards is reported as `RowOrphaned`.
    pub async fn unpublish(&self, session: &Session, photo: &Photo) -> GalleryResult<DeleteOutcome> {
        let path = photo.object_path(self.bucket()).ok_or_else(|| {
            GalleryError::Validation(format!("Photo {} has no resolvable object path", photo.id))
        })?;

        self.remove_object(session, &path).await?;

        match self.delete_photo(session, &photo.id).await {
            Ok(()) => {
                info!("Deleted photo {} and object {}", photo.id, path);
                Ok(DeleteOutcome::Committed)
            }
            Err(e) => {
                warn!("Row delete failed after object removal, photo {} dangling: {}", photo.id, e);
                Ok(DeleteOutcome::RowOrphaned {
                    id: photo.id.clone(),
                    error: e.to_string(),
                })
            }
        }
    }
}
