//! Account, entry and map handlers

use crate::auth::{self, FlashKind, SessionUser};
use crate::error::AppError;
use crate::server::session::{set_session_cookie, SessionId};
use crate::server::state::AppState;
use crate::store::StoreError;
use crate::types::{AlertRequest, Credentials, EntryForm, MapQuery};
use crate::views::portal;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Popup label for alerts sent without logging in
const GUEST_NAME: &str = "Invitado";

/// Landing page for a signed-in user
fn home_for(user: &SessionUser) -> &'static str {
    if user.is_admin {
        "/dashboard"
    } else {
        "/my_entries"
    }
}

fn redirect_with_flash(
    state: &AppState,
    session: &SessionId,
    kind: FlashKind,
    message: &str,
    to: &str,
) -> Response {
    state.sessions.flash(session.as_str(), kind, message);
    Redirect::to(to).into_response()
}

/// Signed-in user, or a redirect to the login page
fn require_login(state: &AppState, session: &SessionId) -> Result<SessionUser, Response> {
    match state.auth(session).user() {
        Some(user) => Ok(user.clone()),
        None => Err(redirect_with_flash(
            state,
            session,
            FlashKind::Info,
            "Please log in to access this page.",
            "/login",
        )),
    }
}

/// `GET /register`
pub async fn register_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    portal::register(&state.page(&session))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<Credentials>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(redirect_with_flash(
            &state,
            &session,
            FlashKind::Error,
            "Username and password are required.",
            "/register",
        ));
    }

    let password = form.password;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password)).await?;

    match state.store.create_user(username, &password_hash, false) {
        Ok(user) => {
            info!(username = %user.username, "User registered");
            Ok(redirect_with_flash(
                &state,
                &session,
                FlashKind::Success,
                "Registration successful. Please log in.",
                "/login",
            ))
        }
        Err(StoreError::DuplicateUsername(_)) => Ok(redirect_with_flash(
            &state,
            &session,
            FlashKind::Error,
            "Username exists already. Choose another one.",
            "/register",
        )),
        Err(e) => Err(e.into()),
    }
}

/// `GET /login`
pub async fn login_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    if let Some(user) = state.auth(&session).user() {
        return Redirect::to(home_for(user)).into_response();
    }
    portal::login(&state.page(&session)).into_response()
}

/// `POST /login`. A successful login moves the session to a fresh id.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<Credentials>,
) -> Result<Response, AppError> {
    let store = state.store.clone();
    let username = form.username.trim().to_string();
    let password = form.password;
    let user = tokio::task::spawn_blocking(move || auth::authenticate(&store, &username, &password))
        .await??;

    match user {
        Some(user) => {
            let session = SessionId(state.sessions.rotate(session.as_str()));
            state.sessions.login(session.as_str(), &user);
            let home = home_for(&SessionUser::from(&user));
            let mut response = redirect_with_flash(
                &state,
                &session,
                FlashKind::Success,
                "Logged in successfully.",
                home,
            );
            set_session_cookie(&mut response, &state.config.auth.session_cookie, session.as_str());
            Ok(response)
        }
        None => {
            info!(username = %form.username, "Failed login attempt");
            Ok(redirect_with_flash(
                &state,
                &session,
                FlashKind::Error,
                "Invalid username or password.",
                "/login",
            ))
        }
    }
}

/// `GET /logout`
pub async fn logout(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    state.sessions.logout(session.as_str());
    redirect_with_flash(
        &state,
        &session,
        FlashKind::Info,
        "You have been logged out.",
        "/",
    )
}

/// `GET /create_entry`
pub async fn create_entry_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    match require_login(&state, &session) {
        Ok(_) => portal::create_entry(&state.page(&session)).into_response(),
        Err(redirect) => redirect,
    }
}

/// `POST /create_entry`
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppError> {
    let user = match require_login(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let title = form.title.trim();
    if title.is_empty() {
        return Ok(redirect_with_flash(
            &state,
            &session,
            FlashKind::Error,
            "Title is required.",
            "/create_entry",
        ));
    }

    let entry = state.store.create_entry(user.id, title, &form.description)?;
    info!(entry_id = entry.id, username = %user.username, "Entry created");

    Ok(redirect_with_flash(
        &state,
        &session,
        FlashKind::Success,
        "Entry created.",
        home_for(&user),
    ))
}

/// `GET /dashboard`, admins only
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response, AppError> {
    let user = match require_login(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    if !user.is_admin {
        info!(username = %user.username, "Dashboard access denied");
        return Ok(redirect_with_flash(
            &state,
            &session,
            FlashKind::Error,
            "Access denied: administrators only.",
            "/",
        ));
    }

    let entries = state.store.all_entries()?;
    Ok(portal::dashboard(&state.page(&session), &entries).into_response())
}

/// `GET /my_entries`; admins are sent to the dashboard
pub async fn my_entries(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response, AppError> {
    let user = match require_login(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };
    if user.is_admin {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let entries = state.store.entries_for_user(user.id)?;
    Ok(portal::my_entries(&state.page(&session), &entries).into_response())
}

/// `GET /mapa`: the session's latest alert map, or a map centered on the
/// query coordinates (default center when absent)
pub async fn mapa(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<MapQuery>,
) -> Html<String> {
    let explicit_center = query.lat.is_some() || query.lon.is_some();
    let saved = if explicit_center {
        None
    } else {
        state.sessions.map_file(session.as_str())
    };

    let ctx = state.page(&session);
    match saved {
        Some(file_name) => {
            let src = format!("/static/maps/{}", file_name);
            portal::mapa(&ctx, Some(&src), None)
        }
        None => {
            let view = state.maps.centered(query.lat, query.lon);
            portal::mapa(&ctx, None, Some(&state.maps.render_html(&view)))
        }
    }
}

/// `POST /alerta`: write a map marking the reported point
pub async fn alerta(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Json(alert): Json<AlertRequest>,
) -> Result<Json<Value>, AppError> {
    let reporter = state
        .auth(&session)
        .user()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| GUEST_NAME.to_string());

    let view = state.maps.alert(alert.lat, alert.lon, &reporter);
    let file_name = state.maps.write(&view).await?;
    if let Some(previous) = state.sessions.set_map_file(session.as_str(), file_name) {
        if let Err(e) = state.maps.remove(&previous).await {
            warn!(file = %previous, error = %e, "Failed to remove replaced map");
        }
    }

    info!(lat = alert.lat, lon = alert.lon, reporter = %reporter, "Alert received");

    Ok(Json(json!({ "status": "ok" })))
}

/// `GET /static/maps/{file}`
pub async fn map_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Html<String>, AppError> {
    state
        .maps
        .read(&file_name)
        .await?
        .map(Html)
        .ok_or(AppError::NotFound(file_name))
}
