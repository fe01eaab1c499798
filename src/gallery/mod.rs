/// Photo gallery: models, listing, upload and deletion workflows
pub mod deletion;
pub mod listing;
pub mod models;
pub mod stats;
pub mod store;
pub mod upload;

pub use deletion::{DeletionSlot, Deletions};
pub use listing::{CategoryFilter, GalleryView, Page, SortOrder};
pub use models::{Category, NewPhoto, Photo};
pub use stats::{DashboardStats, StorageUsage, UsageLevel};
pub use store::{DeleteOutcome, GalleryStore, ObjectUpload, WriteOutcome};
pub use upload::{UploadCandidate, UploadNotice, UploadReport, UploadWorkflow};
