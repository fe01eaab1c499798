/// Session guard event stream
///
/// Admin views keep this stream open. It reports the session once, then
/// emits a single `redirect` event when the session is signed out or ends.
use crate::{
    auth::{
        guard::{GuardExit, LOGIN_PATH},
        AdminSession,
    },
    context::AppContext,
    error::{GalleryError, GalleryResult},
};
use axum::{
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
    Router,
};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::info;

/// Build session routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/admin/session/events", get(session_events))
}

#[derive(Debug, Serialize)]
struct SessionEvent<'a> {
    user_id: &'a str,
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RedirectEvent {
    location: &'static str,
    reason: &'static str,
}

fn exit_reason(exit: GuardExit) -> &'static str {
    match exit {
        GuardExit::SignedOut => "signed_out",
        GuardExit::SessionEnded => "session_ended",
    }
}

async fn session_events(
    admin: AdminSession,
) -> GalleryResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = admin.session();
    let ready = serde_json::to_string(&SessionEvent {
        user_id: &session.user_id,
        email: session.email.as_deref(),
    })
    .map_err(|e| GalleryError::Internal(format!("Failed to encode session event: {}", e)))?;

    let mut guard = admin.into_guard();
    let exit = stream::once(async move {
        let exit = guard.wait_for_exit().await;
        info!("Session guard for {} exited: {:?}", guard.session().user_id, exit);

        let payload = serde_json::to_string(&RedirectEvent {
            location: LOGIN_PATH,
            reason: exit_reason(exit),
        })
        .unwrap_or_else(|_| format!("{{\"location\":\"{}\"}}", LOGIN_PATH));
        Ok::<_, Infallible>(Event::default().event("redirect").data(payload))
    });

    let events = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("session").data(ready))
    })
    .chain(exit);

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
