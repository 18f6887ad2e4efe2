//! Coordinator errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use nexus_mesh::{AgentId, IdValidationError, MeshError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::RegistryError;

/// Structured error body: `{"error": <code>, "message": <text>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Agent '{0}' not found")]
    AgentNotFound(AgentId),

    #[error("No command with request id '{0}'")]
    CommandNotFound(String),

    #[error("A command with request id '{0}' is already pending")]
    DuplicateRequest(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Bus error: {0}")]
    Bus(#[from] MeshError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

impl CoordinatorError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "agent_not_found",
            Self::CommandNotFound(_) => "command_not_found",
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Bus(_) => "bus_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AgentNotFound(_) | Self::CommandNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRequest(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Bus(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<RegistryError> for CoordinatorError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(agent_id) => Self::AgentNotFound(agent_id),
            RegistryError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<IdValidationError> for CoordinatorError {
    fn from(err: IdValidationError) -> Self {
        Self::InvalidRequest(format!("Invalid identifier: {}", err))
    }
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(
                error_code = %self.error_code(),
                status_code = %status_code,
                error_message = %self,
                "Coordinator request failed"
            );
        } else {
            tracing::debug!(
                error_code = %self.error_code(),
                status_code = %status_code,
                error_message = %self,
                "Coordinator request rejected"
            );
        }

        (status_code, Json(self.to_error_response())).into_response()
    }
}
