/// Authentication extractors for admin routes
use crate::{
    auth::{
        guard::{GuardState, SessionGuard, LOGIN_PATH},
        Session,
    },
    context::AppContext,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Admin session extracted from the request
///
/// Holds the mounted guard for the lifetime of the handler, so long-lived
/// handlers can wait on it.
pub struct AdminSession {
    guard: SessionGuard,
}

impl AdminSession {
    pub fn session(&self) -> &Session {
        self.guard.session()
    }

    pub fn into_guard(self) -> SessionGuard {
        self.guard
    }
}

/// Rejection for guarded routes: send the client to the login view
#[derive(Debug)]
pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminSession {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header_token =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .ok()
                .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        // EventSource clients cannot set headers, so accept a query token too
        let token = header_token.or_else(|| query_token(parts.uri.query()));

        match SessionGuard::mount(&state.sessions, token.as_deref()).await {
            GuardState::Active(guard) => Ok(AdminSession { guard }),
            GuardState::Redirect => Err(LoginRedirect),
        }
    }
}

/// `access_token` from a query string
fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}
