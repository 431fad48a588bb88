//! HTTP error mapping.
//!
//! # Responsibility
//! - Translate core service errors into status codes and `{"error": ...}` bodies.
//!
//! # Invariants
//! - 5xx responses never echo internal error text; the detail goes to the log.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use okra_core::{
    AssignmentServiceError, AuthServiceError, ExperimentServiceError, ParticipantServiceError,
    RepoError,
};
use serde_json::json;
use std::fmt::{Display, Formatter};

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Logs `detail` and hides it from the client.
    pub fn internal(detail: impl Display) -> Self {
        error!("event=http_error module=http status=error error={detail}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::bad_request(err.to_string()),
            RepoError::NotFound { .. } => Self::not_found(value.to_string()),
            RepoError::Conflict(_) => Self::new(StatusCode::CONFLICT, value.to_string()),
            other => Self::internal(other),
        }
    }
}

impl From<ParticipantServiceError> for ApiError {
    fn from(value: ParticipantServiceError) -> Self {
        match value {
            ParticipantServiceError::NotFound(_) | ParticipantServiceError::AlreadyRegistered(_) => {
                Self::not_found(value.to_string())
            }
            ParticipantServiceError::InvalidRegistrationKey
            | ParticipantServiceError::UnknownDeviceKey => Self::unauthorized(value.to_string()),
            ParticipantServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<ExperimentServiceError> for ApiError {
    fn from(value: ExperimentServiceError) -> Self {
        match value {
            ExperimentServiceError::NotFound(_) => Self::not_found(value.to_string()),
            ExperimentServiceError::Validation(_) | ExperimentServiceError::UnknownParticipant(_) => {
                Self::bad_request(value.to_string())
            }
            ExperimentServiceError::Conflict(_) => Self::new(StatusCode::CONFLICT, value.to_string()),
            ExperimentServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<AssignmentServiceError> for ApiError {
    fn from(value: AssignmentServiceError) -> Self {
        match value {
            AssignmentServiceError::ExperimentNotFound(_)
            | AssignmentServiceError::NoTasksAvailable(_)
            | AssignmentServiceError::AssignmentNotFound(_) => Self::not_found(value.to_string()),
            AssignmentServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(value: AuthServiceError) -> Self {
        match value {
            AuthServiceError::InvalidCredentials => Self::unauthorized(value.to_string()),
            AuthServiceError::Validation(_) => Self::bad_request(value.to_string()),
            AuthServiceError::UsernameTaken(_) => Self::new(StatusCode::CONFLICT, value.to_string()),
            AuthServiceError::PasswordHash(_) => Self::internal(value),
            AuthServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use okra_core::{AssignmentServiceError, ParticipantServiceError};
    use uuid::Uuid;

    #[test]
    fn consumed_registration_link_maps_to_not_found() {
        let err: ApiError = ParticipantServiceError::AlreadyRegistered(Uuid::new_v4()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.message().contains("already registered"));
    }

    #[test]
    fn exhausted_assignments_map_to_not_found() {
        let err: ApiError = AssignmentServiceError::NoTasksAvailable(Uuid::new_v4()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "no tasks available");
    }

    #[test]
    fn bad_device_key_maps_to_unauthorized() {
        let err: ApiError = ParticipantServiceError::UnknownDeviceKey.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
