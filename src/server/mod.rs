//! HTTP server: routes, middleware and startup
//!
//! # Example
//!
//! ```ignore
//! use model_portal::server::{self, AppState};
//!
//! let state = AppState::new(config, engine, store);
//! server::run(state, "127.0.0.1:5000".parse()?).await?;
//! ```

mod handlers;
mod portal;
pub mod session;
mod state;


pub use handlers::HealthResponse;
pub use session::SessionId;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use tracing::info;

/// Build the router with every route and middleware attached
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/conceptos_basicos", get(handlers::conceptos_basicos))
        .route("/casos_de_uso_ML", get(handlers::casos_de_uso_ml))
        .route(
            "/prediccion",
            get(handlers::price_form).post(handlers::price_predict),
        )
        .route(
            "/Cursos",
            get(handlers::course_form).post(handlers::course_predict),
        )
        .route("/KNN", get(handlers::knn_form).post(handlers::knn_recommend))
        .route(
            "/register",
            get(portal::register_form).post(portal::register),
        )
        .route("/login", get(portal::login_form).post(portal::login))
        .route("/logout", get(portal::logout))
        .route(
            "/create_entry",
            get(portal::create_entry_form).post(portal::create_entry),
        )
        .route("/dashboard", get(portal::dashboard))
        .route("/my_entries", get(portal::my_entries))
        .route("/mapa", get(portal::mapa))
        .route("/alerta", post(portal::alerta))
        .route("/static/maps/:file", get(portal::map_file))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::track_requests,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn run(state: AppState, address: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
