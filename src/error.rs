use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{authz::Denial, backend::BackendError, role::RoleLevel};

/// AppError
///
/// The error taxonomy shared by the authorization layer and every handler. Each variant
/// maps to exactly one HTTP status, and the JSON body always carries an `error` field.
/// Upstream faults (database, backend) are logged in full but rendered generically so
/// internal detail never reaches the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("{required} role required")]
    Forbidden { required: RoleLevel },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("session token failure: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(BackendError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status)
                    .ok()
                    .filter(|code| code.is_client_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Database(_)
            | AppError::Backend(_)
            | AppError::Token(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the response body. Server faults collapse to a fixed string.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Not authenticated".to_string(),
            AppError::Forbidden { required } => format!("Forbidden: {} role required", required),
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::Validation(message) => message.clone(),
            AppError::Backend(BackendError::Rejected { message, .. })
                if self.status().is_client_error() =>
            {
                message.clone()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => AppError::Unauthenticated,
            Denial::InsufficientRole { required, .. } => AppError::Forbidden { required },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
