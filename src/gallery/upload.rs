/// Batch photo upload
///
/// Files are validated, given a fresh object path and published one at a
/// time. A failing file never aborts the rest of the batch.
use crate::{
    auth::Session,
    config::GalleryConfig,
    error::{GalleryError, GalleryResult},
    gallery::{
        store::{GalleryStore, ObjectUpload, WriteOutcome},
        Category, Photo,
    },
};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Default upload ceiling (5 MiB)
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Category preselected for new uploads
pub const DEFAULT_CATEGORY: Category = Category::Wedding;

/// Root folder for every uploaded object
const IMAGE_ROOT: &str = "images";

const SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A file offered for upload
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Why a candidate never reached storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAnImage,
    TooLarge { size: usize, limit: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotAnImage => write!(f, "Only image files allowed"),
            Rejection::TooLarge { limit, .. } => {
                write!(f, "File too large (max {}MB)", limit / (1024 * 1024))
            }
        }
    }
}

/// Progress notifications emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadNotice {
    Started { total: usize },
    Uploading { file_name: String },
    Rejected { file_name: String, message: String },
    Failed { file_name: String, message: String },
    Completed { succeeded: usize, failed: usize, message: String },
}

/// Outcome of one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub succeeded: usize,
    pub failed: usize,
    pub photos: Vec<Photo>,
    pub notices: Vec<UploadNotice>,
}

impl UploadReport {
    /// Summary line shown once the batch finishes
    pub fn message(&self) -> String {
        if self.succeeded > 0 {
            format!("Successfully uploaded {} photo(s)!", self.succeeded)
        } else {
            format!("Failed to upload {} photo(s)", self.failed)
        }
    }

    fn reject(&mut self, file_name: &str, message: String) {
        self.failed += 1;
        self.notices.push(UploadNotice::Rejected {
            file_name: file_name.to_string(),
            message,
        });
    }

    fn fail(&mut self, file_name: &str, message: String) {
        self.failed += 1;
        self.notices.push(UploadNotice::Failed {
            file_name: file_name.to_string(),
            message,
        });
    }
}

/// Check MIME type first, then size
pub fn validate_candidate(candidate: &UploadCandidate, max_bytes: usize) -> Result<(), Rejection> {
    if !candidate.mime_type.starts_with("image/") {
        return Err(Rejection::NotAnImage);
    }
    if candidate.bytes.len() > max_bytes {
        return Err(Rejection::TooLarge {
            size: candidate.bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Lower-cased extension of `file_name`, falling back to the MIME subtype
///
/// Only `[a-z0-9+]` survives into an object key; anything else in the
/// client-supplied name falls through to the MIME subtype, then `bin`.
pub fn file_extension(file_name: &str, mime_type: &str) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| clean_extension(ext));
    let from_mime = || {
        mime_type
            .split_once('/')
            .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
            .and_then(clean_extension)
    };

    from_name
        .or_else(from_mime)
        .unwrap_or_else(|| "bin".to_string())
}

fn clean_extension(ext: &str) -> Option<String> {
    let ext = ext.to_ascii_lowercase();
    let valid = !ext.is_empty()
        && ext
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '+');
    valid.then_some(ext)
}

/// Six random lower-case base-36 characters
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

/// `images/[{category}/]{millis}_{suffix}.{ext}`
pub fn object_path(folder: Option<Category>, millis: i64, suffix: &str, ext: &str) -> String {
    match folder {
        Some(category) => format!("{}/{}/{}_{}.{}", IMAGE_ROOT, category, millis, suffix, ext),
        None => format!("{}/{}_{}.{}", IMAGE_ROOT, millis, suffix, ext),
    }
}

/// Runs upload batches against a gallery store
pub struct UploadWorkflow<'a> {
    store: &'a GalleryStore,
    max_bytes: usize,
    category_folders: bool,
}

impl<'a> UploadWorkflow<'a> {
    pub fn new(store: &'a GalleryStore, config: &GalleryConfig) -> Self {
        Self {
            store,
            max_bytes: config.max_upload_bytes,
            category_folders: config.category_folders,
        }
    }

    fn derive_path(&self, candidate: &UploadCandidate, category: Category) -> String {
        let folder = self.category_folders.then_some(category);
        object_path(
            folder,
            chrono::Utc::now().timestamp_millis(),
            &random_suffix(),
            &file_extension(&candidate.file_name, &candidate.mime_type),
        )
    }

    /// Upload every candidate under `category`, one file at a time
    pub async fn run(
        &self,
        session: &Session,
        category: Category,
        files: Vec<UploadCandidate>,
    ) -> GalleryResult<UploadReport> {
        if files.is_empty() {
            return Err(GalleryError::Validation("No files selected".to_string()));
        }

        let mut report = UploadReport::default();
        report.notices.push(UploadNotice::Started { total: files.len() });
        info!("Uploading {} file(s) to category {}", files.len(), category);

        for candidate in files {
            if let Err(rejection) = validate_candidate(&candidate, self.max_bytes) {
                warn!("Rejected {}: {}", candidate.file_name, rejection);
                report.reject(&candidate.file_name, format!("{}: {}", candidate.file_name, rejection));
                continue;
            }

            let path = self.derive_path(&candidate, category);
            report.notices.push(UploadNotice::Uploading {
                file_name: candidate.file_name.clone(),
            });

            let upload = ObjectUpload {
                path: &path,
                data: candidate.bytes,
                mime_type: &candidate.mime_type,
            };

            match self
                .store
                .publish(session, upload, &candidate.file_name, category)
                .await
            {
                Ok(WriteOutcome::Committed(photo)) => {
                    report.succeeded += 1;
                    report.photos.push(photo);
                }
                Ok(WriteOutcome::ObjectOrphaned { error, .. }) => {
                    report.fail(&candidate.file_name, error);
                }
                Err(e) => {
                    error!("Upload of {} failed: {}", candidate.file_name, e);
                    report.fail(&candidate.file_name, e.to_string());
                }
            }
        }

        let message = report.message();
        info!("{}", message);
        report.notices.push(UploadNotice::Completed {
            succeeded: report.succeeded,
            failed: report.failed,
            message,
        });

        Ok(report)
    }
}
