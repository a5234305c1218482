//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, FreelancerError, ProjectError, RepositoryError};
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Freelancer(freelancer_err) => match freelancer_err {
            FreelancerError::AlreadyRegistered(_) => (StatusCode::CONFLICT, err.to_string()),
            FreelancerError::InvalidHours { .. } | FreelancerError::NameRequired => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        DomainError::Project(project_err) => match project_err {
            ProjectError::AlreadyJoined { .. } | ProjectError::AlreadyRegistered(_) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ProjectError::InvalidHours { .. } | ProjectError::NameRequired => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        DomainError::UnknownFreelancer(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        DomainError::ProjectNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Repository(RepositoryError::VersionConflict { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
