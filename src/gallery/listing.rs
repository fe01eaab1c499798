/// Gallery listing: client-side filtering, search, pagination and lazy reveal
///
/// The backend is asked for everything (or for the teaser's handful of
/// newest rows); narrowing happens here.
use crate::{
    error::{GalleryError, GalleryResult},
    gallery::{Category, Photo},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Photos per page on the full gallery
pub const PHOTOS_PER_PAGE: usize = 8;

/// Photos in the home page teaser
pub const TEASER_LIMIT: usize = 6;

/// Distance outside the viewport at which a grid cell starts loading
pub(crate) const REVEAL_ROOT_MARGIN: f64 = 50.0;

/// Ordering by `created_at`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "newest")]
    NewestFirst,
    #[serde(rename = "oldest")]
    OldestFirst,
}

/// Category selection; `all` bypasses filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, photo: &Photo) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => photo.category == *category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(CategoryFilter::All),
            other => other.parse().map(CategoryFilter::Only),
        }
    }
}

/// Case-insensitive substring match on the original file name
fn matches_search(photo: &Photo, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    photo
        .file_name
        .as_deref()
        .map(|name| name.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Apply category filter and free-text search, preserving order
pub fn filter_photos<'a>(photos: &'a [Photo], filter: CategoryFilter, search: &str) -> Vec<&'a Photo> {
    let needle = search.trim().to_lowercase();
    photos
        .iter()
        .filter(|photo| filter.matches(photo) && matches_search(photo, &needle))
        .collect()
}

/// `ceil(items / page_size)`
pub fn total_pages(items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    items.div_ceil(page_size)
}

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub photos: Vec<Photo>,
    /// 1-based
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// The request moved to a different page
    pub scroll_to_top: bool,
}

/// Listing state for one grid: the fetched photos plus filter and page
#[derive(Debug, Clone)]
pub struct GalleryView {
    photos: Vec<Photo>,
    filter: CategoryFilter,
    search: String,
    page: usize,
    page_size: usize,
    scroll_to_top: bool,
}

impl GalleryView {
    pub fn new(page_size: usize) -> Self {
        Self {
            photos: Vec::new(),
            filter: CategoryFilter::All,
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
            scroll_to_top: false,
        }
    }

    /// Replace the list wholesale after a fetch
    pub fn replace(&mut self, photos: Vec<Photo>) {
        self.photos = photos;
        self.clamp_page();
    }

    /// Drop one photo after a successful delete
    pub fn remove(&mut self, id: &str) -> Option<Photo> {
        let index = self.photos.iter().position(|p| p.id == id)?;
        let removed = self.photos.remove(index);
        self.clamp_page();
        Some(removed)
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    /// Change the category; a new category starts again from page 1
    pub fn set_category(&mut self, filter: CategoryFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, search: &str) {
        if self.search != search {
            self.search = search.to_string();
            self.page = 1;
        }
    }

    pub fn filtered(&self) -> Vec<&Photo> {
        filter_photos(&self.photos, self.filter, &self.search)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered().len(), self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Jump to a page. Out-of-range requests are ignored and return false.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        if page != self.page {
            self.page = page;
            self.scroll_to_top = true;
        }
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page + 1)
    }

    pub fn prev(&mut self) -> bool {
        self.page > 1 && self.go_to(self.page - 1)
    }

    /// Whether the last page change asked for the viewport to jump to the top
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_top)
    }

    /// Materialize the current page
    pub fn page(&self) -> Page {
        let filtered = self.filtered();
        let total_items = filtered.len();
        let start = (self.page - 1) * self.page_size;
        let photos = filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        Page {
            photos,
            page: self.page,
            total_pages: total_pages(total_items, self.page_size),
            total_items,
            has_prev: self.has_prev(),
            has_next: self.has_next(),
            scroll_to_top: self.scroll_to_top,
        }
    }

    /// Materialize the current page and consume the scroll request
    pub fn take_page(&mut self) -> Page {
        let mut page = self.page();
        page.scroll_to_top = self.take_scroll_request();
        page
    }

    /// Validate a requested page against the current filter
    pub fn select_page(&mut self, page: usize) -> GalleryResult<()> {
        let last = self.total_pages().max(1);
        if page == self.page || self.go_to(page) {
            return Ok(());
        }
        Err(GalleryError::Validation(format!(
            "Page {} is out of range (1..={})",
            page, last
        )))
    }

    fn clamp_page(&mut self) {
        let last = self.total_pages().max(1);
        if self.page > last {
            self.page = last;
        }
    }
}

/// Vertical extent of the visible area, in pixels
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub(crate) struct Viewport {
    pub top: f64,
    pub bottom: f64,
}

/// Position report for one grid cell
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub(crate) struct IntersectionEntry {
    pub id: String,
    pub top: f64,
    pub bottom: f64,
}

/// Tracks which grid cells have come near the viewport and may load
///
/// Cells are revealed once and stay revealed. After `disconnect` the
/// tracker ignores further reports.
#[derive(Debug)]
#[allow(dead_code)]
pub(crate) struct LazyReveal {
    root_margin: f64,
    revealed: HashSet<String>,
    connected: bool,
}

impl Default for LazyReveal {
    fn default() -> Self {
        Self::new(REVEAL_ROOT_MARGIN)
    }
}

#[allow(dead_code)]
impl LazyReveal {
    pub fn new(root_margin: f64) -> Self {
        Self {
            root_margin,
            revealed: HashSet::new(),
            connected: true,
        }
    }

    /// Process a batch of position reports; returns ids revealed by this batch
    pub fn observe(&mut self, viewport: Viewport, entries: &[IntersectionEntry]) -> Vec<String> {
        if !self.connected {
            return Vec::new();
        }

        let top = viewport.top - self.root_margin;
        let bottom = viewport.bottom + self.root_margin;
        entries
            .iter()
            .filter(|entry| entry.bottom >= top && entry.top <= bottom)
            .filter(|entry| self.revealed.insert(entry.id.clone()))
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn is_revealed(&self, id: &str) -> bool {
        self.revealed.contains(id)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.len()
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }
}
