//! Prediction and informational page handlers

use crate::error::AppError;
use crate::feature_extractor::FormFields;
use crate::server::session::SessionId;
use crate::server::state::AppState;
use crate::types::{CourseQuery, KnnQuery, PriceQuery};
use crate::views::{self, predict};
use axum::extract::State;
use axum::response::Html;
use axum::{Extension, Form, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};

/// Run `f`, recording its latency and outcome under `model`
fn timed<T, E>(state: &AppState, model: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let start = Instant::now();
    let result = f();
    state
        .metrics
        .record_prediction(model, start.elapsed(), result.is_ok());
    result
}

pub async fn index(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Html<String> {
    views::index(&state.page(&session))
}

pub async fn conceptos_basicos(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    views::conceptos_basicos(&state.page(&session))
}

pub async fn casos_de_uso_ml(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    views::casos_de_uso_ml(&state.page(&session))
}

/// `GET /prediccion`
pub async fn price_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    predict::price_page(&state.page(&session), None)
}

/// `POST /prediccion`
pub async fn price_predict(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<FormFields>,
) -> Result<Html<String>, AppError> {
    let query = PriceQuery::from_form(&form)?;
    let features = state.extractor.price(&query);
    let price = timed(&state, "price", || state.engine.price().predict(&features))?;

    info!(
        rainfall = query.rainfall,
        temperature = query.temperature,
        price,
        "Coffee price predicted"
    );

    Ok(predict::price_page(&state.page(&session), Some(price)))
}

/// `GET /Cursos`
pub async fn course_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    predict::course_page(
        &state.page(&session),
        None,
        state.engine.approval().evaluation(),
    )
}

/// `POST /Cursos`
pub async fn course_predict(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<FormFields>,
) -> Result<Html<String>, AppError> {
    let query = CourseQuery::from_form(&form)?;
    let features = state.extractor.course(&query);
    let approved = timed(&state, "approval", || state.engine.approval().predict(&features))? == 1;

    info!(
        horas = query.horas,
        foros = query.foros,
        nivel = %query.nivel,
        approved,
        "Course approval predicted"
    );

    let verdict = if approved { "Sí" } else { "No" };
    Ok(predict::course_page(
        &state.page(&session),
        Some(verdict),
        state.engine.approval().evaluation(),
    ))
}

/// `GET /KNN`
pub async fn knn_form(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Html<String> {
    predict::knn_page(&state.page(&session), None, None)
}

/// `POST /KNN`. Failures are shown on the page instead of failing the request.
pub async fn knn_recommend(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<FormFields>,
) -> Html<String> {
    let outcome = KnnQuery::from_form(&form)
        .map_err(|e| e.to_string())
        .and_then(|query| {
            let features = state.extractor.knn(&query);
            timed(&state, "recommender", || {
                state.engine.recommender().recommend(&features)
            })
            .map_err(|e| e.to_string())
        });

    let ctx = state.page(&session);
    match outcome {
        Ok(category) => {
            info!(category = %category, "Category recommended");
            predict::knn_page(&ctx, Some(&category), None)
        }
        Err(message) => {
            warn!(error = %message, "Recommendation failed");
            predict::knn_page(&ctx, None, Some(&message))
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub models: Vec<&'static str>,
    pub users: i64,
    pub active_sessions: usize,
    pub requests_handled: u64,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.metrics.uptime().as_secs(),
        models: state.engine.model_names(),
        users: state.store.user_count()?,
        active_sessions: state.sessions.len(),
        requests_handled: state.metrics.requests_handled.load(Ordering::Relaxed),
    }))
}
