//! Errors surfaced by HTTP handlers

use crate::feature_extractor::CoercionError;
use crate::models::ModelError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad form input: {0}")]
    Coercion(#[from] CoercionError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = format!(
            "<!DOCTYPE html><html><body><h1>{}</h1></body></html>",
            status.canonical_reason().unwrap_or("Error")
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let coercion = AppError::from(CoercionError::Missing("rainfall".into()));
        assert_eq!(coercion.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::NotFound("map".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_body_is_generic() {
        let response = AppError::from(ModelError::UnknownClass(4)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_task_failure_is_server_error() {
        let join_error = tokio::task::spawn_blocking(|| panic!("hash worker died"))
            .await
            .unwrap_err();
        let error = AppError::from(join_error);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
