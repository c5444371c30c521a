use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{models::ModelError, repository::RepoError};

/// ErrorBody
///
/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// AdminError
///
/// Handler-level error type. Every variant maps to one HTTP status; store
/// failures are logged here and never echoed to the client.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Still referenced: {0}")]
    InUse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::Forbidden => StatusCode::FORBIDDEN,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Conflict(_) | AdminError::InUse(_) => StatusCode::CONFLICT,
            AdminError::Database(_) | AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AdminError::Unauthorized => ("unauthorized", "Please log in first.".to_string()),
            AdminError::Forbidden => ("forbidden", "You do not have access to this page.".to_string()),
            AdminError::NotFound(what) => ("not_found", format!("{} not found.", what)),
            AdminError::Conflict(msg) => ("conflict", msg.clone()),
            AdminError::InUse(msg) => ("in_use", msg.clone()),
            AdminError::Database(msg) => {
                tracing::error!(target: "database", error = %msg, "store operation failed");
                ("database", "Something went wrong. Please try again.".to_string())
            }
            AdminError::Internal(msg) => {
                tracing::error!(target: "internal", error = %msg, "internal error");
                ("internal", "Something went wrong. Please try again.".to_string())
            }
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepoError> for AdminError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AdminError::NotFound(what),
            RepoError::Duplicate(what) => AdminError::Conflict(format!("{} already exists.", what)),
            RepoError::InUse(what) => AdminError::InUse(what),
            // Constraint names stay in the log.
            RepoError::MissingReference(constraint) => {
                tracing::info!(%constraint, "reference to a missing row");
                AdminError::NotFound("Referenced record".to_string())
            }
            RepoError::Database(e) => AdminError::Database(e.to_string()),
        }
    }
}

impl From<ModelError> for AdminError {
    fn from(err: ModelError) -> Self {
        AdminError::Internal(err.to_string())
    }
}
