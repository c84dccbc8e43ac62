//! Session cookie and request accounting middleware

use crate::auth::SessionStore;
use crate::server::state::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Duration;
use tracing::{debug, warn};

/// Identifier of the session attached to the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Value of cookie `name` from the request headers
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Route key for requests that matched no route
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Upper bound on the pause between idle-session sweeps
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Append a `Set-Cookie` header binding `id` to the session cookie
pub fn set_session_cookie(response: &mut Response, name: &str, id: &str) {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, id);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

/// Attach a [`SessionId`] to every request.
///
/// Requests without a known cookie get a provisional id. It only becomes a
/// session, and only earns a cookie, if a handler writes to it.
pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let cookie_name = state.config.auth.session_cookie.clone();

    let existing = session_cookie(req.headers(), &cookie_name).filter(|id| state.sessions.exists(id));
    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (SessionStore::new_id(), true),
    };

    req.extensions_mut().insert(SessionId(id.clone()));
    let mut response = next.run(req).await;

    if fresh && state.sessions.exists(&id) {
        set_session_cookie(&mut response, &cookie_name, &id);
    }
    response
}

/// Count requests per route and server errors.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    state.metrics.record_request(&route);
    if response.status().is_server_error() {
        state.metrics.record_server_error();
    }
    debug!(%method, route = %route, path = %path, status = response.status().as_u16(), "Request handled");
    response
}

/// Drop idle sessions and delete the map files they owned
pub async fn purge_idle_sessions(state: &AppState, max_idle: Duration) {
    for file_name in state.sessions.purge_idle(max_idle) {
        if let Err(e) = state.maps.remove(&file_name).await {
            warn!(file = %file_name, error = %e, "Failed to remove map file");
        }
    }
}

/// Background task purging sessions idle longer than `session_idle_secs`
pub async fn sweep_idle_sessions(state: AppState) {
    let max_idle = Duration::from_secs(state.config.auth.session_idle_secs);
    let mut interval = tokio::time::interval(max_idle.min(SWEEP_INTERVAL));
    interval.tick().await;
    loop {
        interval.tick().await;
        purge_idle_sessions(&state, max_idle).await;
    }
}
