/// Dashboard statistics and storage estimate
use crate::{
    auth::Session,
    error::GalleryResult,
    gallery::{listing::SortOrder, store::GalleryStore, Category},
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

/// Assumed average size of one stored photo, in MB
pub const ESTIMATED_MB_PER_PHOTO: f64 = 1.5;

/// Default storage quota, in MB
pub const DEFAULT_STORAGE_LIMIT_MB: f64 = 1024.0;

const WARNING_RATIO: f64 = 0.7;
const CRITICAL_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub label: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_photos: u64,
    pub this_month: u64,
    /// Every category, in display order, including empty ones
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used_mb: f64,
    pub limit_mb: f64,
    pub level: UsageLevel,
}

impl StorageUsage {
    /// Estimate usage from the row count
    pub fn estimate(photo_count: u64, limit_mb: f64) -> Self {
        let used_mb = (photo_count as f64 * ESTIMATED_MB_PER_PHOTO * 100.0).round() / 100.0;
        let ratio = if limit_mb > 0.0 { used_mb / limit_mb } else { 1.0 };
        let level = if ratio > CRITICAL_RATIO {
            UsageLevel::Critical
        } else if ratio > WARNING_RATIO {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        };

        Self {
            used_mb,
            limit_mb,
            level,
        }
    }

    pub fn percent(&self) -> f64 {
        if self.limit_mb <= 0.0 {
            return 100.0;
        }
        (self.used_mb / self.limit_mb * 100.0).min(100.0)
    }
}

/// Midnight UTC on the first day of the month containing `now`
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Collect the dashboard numbers
pub async fn dashboard_stats(store: &GalleryStore, session: &Session) -> GalleryResult<DashboardStats> {
    let total_photos = store.count_photos(Some(session), None).await?;
    let this_month = store
        .count_photos(Some(session), Some(start_of_month(Utc::now())))
        .await?;

    let photos = store.list_photos(SortOrder::NewestFirst).await?;
    let categories = Category::ALL
        .iter()
        .map(|&category| CategoryCount {
            category,
            label: category.label(),
            count: photos.iter().filter(|p| p.category == category).count() as u64,
        })
        .collect();

    Ok(DashboardStats {
        total_photos,
        this_month,
        categories,
    })
}

/// Re-estimate storage from the current row count
pub async fn storage_usage(
    store: &GalleryStore,
    session: &Session,
    limit_mb: f64,
) -> GalleryResult<StorageUsage> {
    let count = store.count_photos(Some(session), None).await?;
    Ok(StorageUsage::estimate(count, limit_mb))
}
