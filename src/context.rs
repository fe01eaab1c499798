/// Application context and dependency injection
use crate::{
    auth::SessionManager,
    backend::Backend,
    config::ServerConfig,
    error::GalleryResult,
    gallery::{Deletions, GalleryStore},
};
use std::sync::Arc;

/// Shared services handed to every request
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub sessions: SessionManager,
    pub store: GalleryStore,
    /// Pending deletes, one slot per admin session
    pub deletions: Deletions,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> GalleryResult<Self> {
        config.validate()?;

        let backend = Backend::from_config(&config).await?;
        tracing::info!("Gallery backend ready (bucket: {})", backend.objects.bucket());

        Ok(Self::with_backend(config, backend))
    }

    /// Wire a context around an already-built backend
    pub fn with_backend(config: ServerConfig, backend: Backend) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionManager::new(backend.auth.clone()),
            store: GalleryStore::from_backend(&backend),
            deletions: Deletions::new(),
        }
    }
}
