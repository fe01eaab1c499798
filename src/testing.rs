/// In-memory backend fakes with switchable failures, for unit tests
use crate::{
    auth::Session,
    backend::{ObjectStore, PhotoQuery, PhotoTable},
    error::{GalleryError, GalleryResult},
    gallery::{listing::SortOrder, store::GalleryStore, NewPhoto, Photo},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BUCKET: &str = "gallery";

pub fn session() -> Session {
    Session {
        access_token: "test-token".to_string(),
        user_id: "admin".to_string(),
        email: Some("admin@example.com".to_string()),
        expires_at: None,
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_upload: AtomicBool,
    pub fail_remove: AtomicBool,
    pub upload_calls: AtomicUsize,
}

impl MemoryObjects {
    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn upload(
        &self,
        _session: &Session,
        path: &str,
        data: Vec<u8>,
        _mime_type: &str,
    ) -> GalleryResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(GalleryError::Storage("upload refused".to_string()));
        }
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/storage/v1/object/public/{}/{}", BUCKET, path)
    }

    async fn remove(&self, _session: &Session, paths: &[String]) -> GalleryResult<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(GalleryError::Storage("remove refused".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPhotos {
    rows: Mutex<Vec<Photo>>,
    next_id: AtomicUsize,
    pub fail_insert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_select: AtomicBool,
    pub insert_calls: AtomicUsize,
    last_query: Mutex<Option<PhotoQuery>>,
}

impl MemoryPhotos {
    pub fn last_query(&self) -> Option<PhotoQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn rows(&self) -> Vec<Photo> {
        self.rows.lock().unwrap().clone()
    }

    /// Seed a row created `age_minutes` ago
    pub fn seed(&self, photo: NewPhoto, age_minutes: i64) -> Photo {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = Photo {
            id: id.to_string(),
            image_url: photo.image_url,
            category: photo.category,
            file_name: photo.file_name,
            file_path: photo.file_path,
            alt_text: photo.alt_text,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        };
        self.rows.lock().unwrap().push(row.clone());
        row
    }
}

#[async_trait]
impl PhotoTable for MemoryPhotos {
    async fn select(
        &self,
        _session: Option<&Session>,
        query: &PhotoQuery,
    ) -> GalleryResult<Vec<Photo>> {
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(GalleryError::Backend {
                status: 503,
                message: "select refused".to_string(),
            });
        }
        *self.last_query.lock().unwrap() = Some(query.clone());
        let mut rows: Vec<Photo> = self
            .rows()
            .into_iter()
            .filter(|p| query.id.as_ref().map_or(true, |id| p.id == *id))
            .filter(|p| query.category.map_or(true, |c| p.category == c))
            .filter(|p| query.created_since.map_or(true, |since| p.created_at >= since))
            .collect();
        rows.sort_by_key(|p| p.created_at);
        if query.order == SortOrder::NewestFirst {
            rows.reverse();
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(
        &self,
        session: Option<&Session>,
        created_since: Option<DateTime<Utc>>,
    ) -> GalleryResult<u64> {
        let query = PhotoQuery {
            created_since,
            ..PhotoQuery::default()
        };
        Ok(self.select(session, &query).await?.len() as u64)
    }

    async fn insert(&self, _session: &Session, photo: &NewPhoto) -> GalleryResult<Photo> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(GalleryError::Backend {
                status: 500,
                message: "insert refused".to_string(),
            });
        }
        Ok(self.seed(photo.clone(), 0))
    }

    async fn delete(&self, _session: &Session, id: &str) -> GalleryResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(GalleryError::Backend {
                status: 500,
                message: "delete refused".to_string(),
            });
        }
        self.rows.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }
}

pub fn store() -> (GalleryStore, Arc<MemoryObjects>, Arc<MemoryPhotos>) {
    let objects = Arc::new(MemoryObjects::default());
    let photos = Arc::new(MemoryPhotos::default());
    let store = GalleryStore::new(objects.clone(), photos.clone());
    (store, objects, photos)
}
