use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
}

impl MonitorError {
    fn code(&self) -> &'static str {
        match self {
            MonitorError::Database(_) | MonitorError::Migration(_) => "DATABASE_ERROR",
            MonitorError::Configuration(_) => "CONFIGURATION_ERROR",
            MonitorError::Validation(_) => "VALIDATION_ERROR",
            MonitorError::UserNotFound(_) | MonitorError::TransactionNotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<threat_engine::Error> for MonitorError {
    fn from(err: threat_engine::Error) -> Self {
        match err {
            threat_engine::Error::InvalidInput(msg) => MonitorError::Validation(msg),
            threat_engine::Error::InvalidConfig(msg) => MonitorError::Configuration(msg),
        }
    }
}

impl From<validator::ValidationErrors> for MonitorError {
    fn from(err: validator::ValidationErrors) -> Self {
        MonitorError::Validation(err.to_string())
    }
}

impl ResponseError for MonitorError {
    fn status_code(&self) -> StatusCode {
        match self {
            MonitorError::Validation(_) => StatusCode::BAD_REQUEST,
            MonitorError::UserNotFound(_) | MonitorError::TransactionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
