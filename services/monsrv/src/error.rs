//! Monsrv error types and HTTP mapping

use alarm_core::{CatalogError, StoreError};
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, MonsrvError>;

#[derive(Debug, Error)]
pub enum MonsrvError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Threshold catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonsrvError {
    pub fn not_found(what: impl Into<String>) -> Self {
        MonsrvError::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        MonsrvError::InvalidInput(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MonsrvError::NotFound(_) => StatusCode::NOT_FOUND,
            MonsrvError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for MonsrvError {
    fn from(err: QueryRejection) -> Self {
        MonsrvError::InvalidInput(err.body_text())
    }
}

impl From<sqlx::Error> for MonsrvError {
    fn from(err: sqlx::Error) -> Self {
        MonsrvError::Database(err.to_string())
    }
}

impl From<StoreError> for MonsrvError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => MonsrvError::NotFound(format!("Alarm {}", id)),
            StoreError::Database(msg) => MonsrvError::Database(msg),
            StoreError::Serialization(msg) => MonsrvError::Internal(msg),
        }
    }
}

impl From<figment::Error> for MonsrvError {
    fn from(err: figment::Error) -> Self {
        MonsrvError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for MonsrvError {
    fn from(err: anyhow::Error) -> Self {
        MonsrvError::Internal(err.to_string())
    }
}

// HTTP response conversion for Axum
impl IntoResponse for MonsrvError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            MonsrvError::NotFound(_) | MonsrvError::InvalidInput(_) => self.to_string(),
            _ => {
                tracing::error!("Request failed: {}", self);
                "Internal server error".to_string()
            },
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "data": null,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
