/// Confirmed photo deletion
///
/// Each admin session owns one slot. A delete is first requested, which
/// only marks the photo as pending, and then confirmed or cancelled.
use crate::{
    auth::Session,
    error::{GalleryError, GalleryResult},
    gallery::store::{DeleteOutcome, GalleryStore},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "photo_id", rename_all = "snake_case")]
pub enum DeletionSlot {
    #[default]
    Idle,
    ConfirmPending(String),
    Deleting(String),
}

impl DeletionSlot {
    /// Mark `id` as awaiting confirmation, replacing any earlier request
    pub fn request(&mut self, id: &str) -> GalleryResult<()> {
        if let DeletionSlot::Deleting(current) = self {
            return Err(GalleryError::Conflict(format!(
                "Photo {} is still being deleted",
                current
            )));
        }
        *self = DeletionSlot::ConfirmPending(id.to_string());
        Ok(())
    }

    /// Drop a pending request; returns whether anything was pending
    pub fn cancel(&mut self) -> bool {
        match self {
            DeletionSlot::ConfirmPending(_) => {
                *self = DeletionSlot::Idle;
                true
            }
            _ => false,
        }
    }

    /// Move from pending to deleting
    pub fn begin(&mut self) -> GalleryResult<String> {
        match std::mem::take(self) {
            DeletionSlot::ConfirmPending(id) => {
                *self = DeletionSlot::Deleting(id.clone());
                Ok(id)
            }
            DeletionSlot::Deleting(id) => {
                let message = format!("Photo {} is still being deleted", id);
                *self = DeletionSlot::Deleting(id);
                Err(GalleryError::Conflict(message))
            }
            DeletionSlot::Idle => Err(GalleryError::Validation(
                "No deletion is awaiting confirmation".to_string(),
            )),
        }
    }

    pub fn finish(&mut self) {
        *self = DeletionSlot::Idle;
    }

    pub fn pending(&self) -> Option<&str> {
        match self {
            DeletionSlot::ConfirmPending(id) => Some(id),
            _ => None,
        }
    }
}

/// How long an unconfirmed request survives for sessions without a known expiry
const PENDING_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct SlotEntry {
    slot: DeletionSlot,
    session_expires_at: Option<DateTime<Utc>>,
    requested_at: DateTime<Utc>,
}

impl SlotEntry {
    fn new(session: &Session) -> Self {
        Self {
            slot: DeletionSlot::Idle,
            session_expires_at: session.expires_at,
            requested_at: Utc::now(),
        }
    }

    /// Idle slots, slots of expired sessions and abandoned requests
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.slot {
            DeletionSlot::Idle => true,
            DeletionSlot::Deleting(_) => false,
            DeletionSlot::ConfirmPending(_) => match self.session_expires_at {
                Some(expires_at) => expires_at <= now,
                None => now - self.requested_at > Duration::minutes(PENDING_TTL_MINUTES),
            },
        }
    }
}

/// Deletion slots keyed by session token
#[derive(Clone, Default)]
pub struct Deletions {
    slots: Arc<Mutex<HashMap<String, SlotEntry>>>,
}

impl Deletions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn slot(&self, session: &Session) -> DeletionSlot {
        self.slots
            .lock()
            .await
            .get(&session.access_token)
            .map(|entry| entry.slot.clone())
            .unwrap_or_default()
    }

    /// Mark a photo as pending; slots left behind by ended sessions are
    /// dropped first
    pub async fn request(&self, session: &Session, id: &str) -> GalleryResult<DeletionSlot> {
        let mut slots = self.slots.lock().await;
        let now = Utc::now();
        let before = slots.len();
        slots.retain(|token, entry| *token == session.access_token || !entry.is_stale(now));
        if slots.len() < before {
            debug!("Pruned {} stale deletion slot(s)", before - slots.len());
        }

        let entry = slots
            .entry(session.access_token.clone())
            .or_insert_with(|| SlotEntry::new(session));
        entry.slot.request(id)?;
        entry.session_expires_at = session.expires_at;
        entry.requested_at = now;
        debug!("Photo {} awaiting delete confirmation", id);
        Ok(entry.slot.clone())
    }

    /// Cancel without touching the backend
    pub async fn cancel(&self, session: &Session) -> bool {
        let mut slots = self.slots.lock().await;
        let cancelled = slots
            .get_mut(&session.access_token)
            .map(|entry| entry.slot.cancel())
            .unwrap_or(false);
        slots.retain(|_, entry| entry.slot != DeletionSlot::Idle);
        cancelled
    }

    /// Delete the pending photo: object first, then row
    ///
    /// The slot returns to idle whatever the outcome.
    pub async fn confirm(&self, store: &GalleryStore, session: &Session) -> GalleryResult<DeleteOutcome> {
        let id = {
            let mut slots = self.slots.lock().await;
            match slots.get_mut(&session.access_token) {
                Some(entry) => entry.slot.begin()?,
                None => DeletionSlot::default().begin()?,
            }
        };

        let result = Self::delete(store, session, &id).await;

        let mut slots = self.slots.lock().await;
        slots.remove(&session.access_token);

        result
    }

    async fn delete(store: &GalleryStore, session: &Session, id: &str) -> GalleryResult<DeleteOutcome> {
        let photo = store
            .find_photo(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(format!("Photo not found: {}", id)))?;

        match store.unpublish(session, &photo).await {
            Ok(outcome) => {
                info!("Delete of photo {} finished: {:?}", id, outcome);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Delete of photo {} failed, row kept: {}", id, e);
                Err(e)
            }
        }
    }

    /// Forget the slot of a session that has ended
    pub async fn clear(&self, session: &Session) {
        self.slots.lock().await.remove(&session.access_token);
    }
}
