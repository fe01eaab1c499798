/// Admin authentication
///
/// Sessions are explicit values handed to every backend call that needs
/// them. `SessionManager` is the single place that creates and ends them,
/// and it broadcasts each transition so guards can react.

pub mod extract;
pub mod guard;

pub use extract::AdminSession;
pub use guard::{GuardState, SessionGuard};

use crate::{backend::AuthBackend, error::GalleryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the auth event channel
const AUTH_EVENT_CAPACITY: usize = 64;

/// An authenticated admin session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| exp <= Utc::now()).unwrap_or(false)
    }
}

/// Auth state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { access_token: String },
}

/// Owns session lifecycle and the auth event channel
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { backend, events }
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> GalleryResult<Session> {
        let session = self.backend.sign_in(email, password).await?;
        tracing::info!("Admin {} signed in", session.user_id);

        // No receivers is fine; nobody is watching yet
        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: session.user_id.clone(),
        });

        Ok(session)
    }

    /// Sign out and notify every guard watching this session
    pub async fn sign_out(&self, session: &Session) -> GalleryResult<()> {
        let result = self.backend.sign_out(session).await;

        // Local state is cleared even if the backend call failed
        let _ = self.events.send(AuthEvent::SignedOut {
            access_token: session.access_token.clone(),
        });
        tracing::info!("Admin {} signed out", session.user_id);

        result
    }

    /// Current session for a token
    pub async fn current(&self, access_token: &str) -> GalleryResult<Option<Session>> {
        let session = self.backend.get_session(access_token).await?;
        Ok(session.filter(|s| !s.is_expired()))
    }

    /// Subscribe to auth state changes
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}
