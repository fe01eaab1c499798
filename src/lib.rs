/// Petal Gallery
///
/// Gallery backend for a floral decoration studio: a public, category
/// filtered photo gallery plus a guarded admin surface for uploads and
/// deletions, over a hosted (Supabase-compatible) or self-hosted store.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod gallery;
pub mod server;

#[cfg(test)]
mod testing;

pub use context::AppContext;
pub use error::{GalleryError, GalleryResult};
