/// Configuration management for Petal Gallery
use crate::{
    backend::local::auth::is_password_hash,
    error::{GalleryError, GalleryResult},
    gallery::{
        listing::{PHOTOS_PER_PAGE, TEASER_LIMIT},
        stats::DEFAULT_STORAGE_LIMIT_MB,
        upload::MAX_UPLOAD_BYTES,
    },
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub gallery: GalleryConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used to build public object URLs
    /// for the local backend
    pub public_url: String,
}

/// Which backend holds auth, objects and the photo table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// Hosted backend-as-a-service (Supabase-compatible REST surface)
    Supabase {
        url: String,
        anon_key: String,
        bucket: String,
        table: String,
    },
    /// Self-hosted: SQLite rows, objects on disk, config-defined admin
    Local {
        data_directory: PathBuf,
        database: PathBuf,
        objects_directory: PathBuf,
        admin_email: String,
        /// Argon2 PHC string for the admin password
        admin_password_hash: String,
        jwt_secret: String,
        session_ttl_secs: i64,
    },
}

/// Gallery behaviour knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Upload ceiling in bytes (default: 5 MiB)
    pub max_upload_bytes: usize,
    /// Photos per page on the full gallery
    pub page_size: usize,
    /// Photos shown in the home page teaser
    pub teaser_limit: usize,
    /// Place uploads under `images/{category}/` instead of `images/`
    pub category_folders: bool,
    /// Storage quota shown on the dashboard, in MB
    pub storage_limit_mb: f64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            page_size: PHOTOS_PER_PAGE,
            teaser_limit: TEASER_LIMIT,
            category_folders: false,
            storage_limit_mb: DEFAULT_STORAGE_LIMIT_MB,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GalleryResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("GALLERY_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("GALLERY_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| GalleryError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("GALLERY_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));

        let backend = if let Ok(url) = env::var("GALLERY_SUPABASE_URL") {
            BackendConfig::Supabase {
                url: url.trim_end_matches('/').to_string(),
                anon_key: env::var("GALLERY_SUPABASE_ANON_KEY").map_err(|_| {
                    GalleryError::Validation("Supabase anon key required".to_string())
                })?,
                bucket: env::var("GALLERY_BUCKET").unwrap_or_else(|_| "gallery".to_string()),
                table: env::var("GALLERY_TABLE").unwrap_or_else(|_| "gallery_photos".to_string()),
            }
        } else {
            let data_directory: PathBuf = env::var("GALLERY_DATA_DIRECTORY")
                .unwrap_or_else(|_| "./data".to_string())
                .into();
            BackendConfig::Local {
                database: env::var("GALLERY_DATABASE_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("gallery.sqlite")),
                objects_directory: env::var("GALLERY_OBJECTS_DIRECTORY")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("objects")),
                data_directory,
                admin_email: env::var("GALLERY_ADMIN_EMAIL")
                    .map_err(|_| GalleryError::Validation("Admin email required".to_string()))?,
                admin_password_hash: env::var("GALLERY_ADMIN_PASSWORD_HASH").map_err(|_| {
                    GalleryError::Validation("Admin password hash required".to_string())
                })?,
                jwt_secret: env::var("GALLERY_JWT_SECRET")
                    .map_err(|_| GalleryError::Validation("JWT secret required".to_string()))?,
                session_ttl_secs: env::var("GALLERY_SESSION_TTL_SECS")
                    .unwrap_or_else(|_| "28800".to_string())
                    .parse()
                    .unwrap_or(28800),
            }
        };

        let defaults = GalleryConfig::default();
        let gallery = GalleryConfig {
            max_upload_bytes: env::var("GALLERY_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            page_size: env::var("GALLERY_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.page_size),
            teaser_limit: env::var("GALLERY_TEASER_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.teaser_limit),
            category_folders: env::var("GALLERY_CATEGORY_FOLDERS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            storage_limit_mb: env::var("GALLERY_STORAGE_LIMIT_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.storage_limit_mb),
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("GALLERY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url: public_url.trim_end_matches('/').to_string(),
            },
            backend,
            gallery,
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> GalleryResult<()> {
        if self.service.hostname.is_empty() {
            return Err(GalleryError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.gallery.page_size == 0 {
            return Err(GalleryError::Validation("Page size must be positive".to_string()));
        }

        if self.gallery.max_upload_bytes == 0 {
            return Err(GalleryError::Validation(
                "Upload limit must be positive".to_string(),
            ));
        }

        match &self.backend {
            BackendConfig::Supabase { url, anon_key, .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(GalleryError::Validation(
                        "Supabase URL must be http(s)".to_string(),
                    ));
                }
                if anon_key.is_empty() {
                    return Err(GalleryError::Validation(
                        "Supabase anon key cannot be empty".to_string(),
                    ));
                }
            }
            BackendConfig::Local {
                jwt_secret,
                admin_password_hash,
                ..
            } => {
                if jwt_secret.len() < 32 {
                    return Err(GalleryError::Validation(
                        "JWT secret must be at least 32 characters".to_string(),
                    ));
                }
                if !is_password_hash(admin_password_hash) {
                    return Err(GalleryError::Validation(
                        "Admin password hash must be an Argon2 PHC string".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(secret: &str) -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8787,
                public_url: "http://localhost:8787".to_string(),
            },
            backend: BackendConfig::Local {
                data_directory: "./data".into(),
                database: "./data/gallery.sqlite".into(),
                objects_directory: "./data/objects".into(),
                admin_email: "admin@example.com".to_string(),
                admin_password_hash: crate::backend::local::auth::hash_password("hunter2")
                    .unwrap(),
                jwt_secret: secret.to_string(),
                session_ttl_secs: 60,
            },
            gallery: GalleryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    #[test]
    fn test_gallery_defaults() {
        let gallery = GalleryConfig::default();
        assert_eq!(gallery.max_upload_bytes, 5_242_880);
        assert_eq!(gallery.page_size, 8);
        assert_eq!(gallery.teaser_limit, 6);
        assert!(!gallery.category_folders);
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        tokio_test::assert_err!(local_config("short").validate());
        tokio_test::assert_ok!(local_config(&"x".repeat(32)).validate());
    }

    #[test]
    fn test_plaintext_admin_password_rejected() {
        let mut config = local_config(&"x".repeat(32));
        if let BackendConfig::Local {
            admin_password_hash,
            ..
        } = &mut config.backend
        {
            *admin_password_hash = "hunter2".to_string();
        }
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = local_config(&"x".repeat(32));
        config.gallery.page_size = 0;
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_supabase_url_must_be_http() {
        let mut config = local_config(&"x".repeat(32));
        config.backend = BackendConfig::Supabase {
            url: "ftp://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            bucket: "gallery".to_string(),
            table: "gallery_photos".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
