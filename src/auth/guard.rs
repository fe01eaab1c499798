/// Session guard for admin-only surfaces
///
/// Mounting looks up the session once. Any failure is treated as "no
/// session" and the caller is sent to the login view. A mounted guard holds
/// an auth event subscription until it is dropped.
use crate::auth::{AuthEvent, Session, SessionManager};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

/// Where the login view lives
pub const LOGIN_PATH: &str = "/admin/login";

/// Outcome of mounting a guard
pub enum GuardState {
    /// A live session; protected content may render
    Active(SessionGuard),
    /// No usable session; render nothing and go to the login view
    Redirect,
}

/// Why an active guard stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardExit {
    /// The guarded session was signed out
    SignedOut,
    /// The session expired or could no longer be confirmed
    SessionEnded,
}

pub struct SessionGuard {
    session: Session,
    manager: SessionManager,
    events: Receiver<AuthEvent>,
}

impl SessionGuard {
    /// Look up the session for `access_token` and start listening for changes
    pub async fn mount(manager: &SessionManager, access_token: Option<&str>) -> GuardState {
        // Subscribe before the lookup so a sign-out racing the mount is seen
        let events = manager.subscribe();

        let Some(token) = access_token else {
            debug!("No session token presented");
            return GuardState::Redirect;
        };

        match manager.current(token).await {
            Ok(Some(session)) => GuardState::Active(SessionGuard {
                session,
                manager: manager.clone(),
                events,
            }),
            Ok(None) => {
                debug!("Session token is not live");
                GuardState::Redirect
            }
            Err(e) => {
                warn!("Session lookup failed, redirecting to login: {}", e);
                GuardState::Redirect
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wait until the guarded session goes away
    pub async fn wait_for_exit(&mut self) -> GuardExit {
        loop {
            let event = match self.session.expires_at {
                Some(expires_at) => {
                    let remaining = (expires_at - chrono::Utc::now())
                        .to_std()
                        .unwrap_or_default();
                    tokio::select! {
                        event = self.events.recv() => event,
                        _ = tokio::time::sleep(remaining) => return GuardExit::SessionEnded,
                    }
                }
                None => self.events.recv().await,
            };

            match event {
                Ok(AuthEvent::SignedOut { access_token })
                    if access_token == self.session.access_token =>
                {
                    return GuardExit::SignedOut;
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Missed events may include our sign-out; ask again
                    warn!("Session guard lagged by {} events, re-checking", skipped);
                    match self.manager.current(&self.session.access_token).await {
                        Ok(Some(_)) => continue,
                        _ => return GuardExit::SessionEnded,
                    }
                }
                Err(RecvError::Closed) => return GuardExit::SessionEnded,
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        debug!("Session guard for {} torn down", self.session.user_id);
    }
}
