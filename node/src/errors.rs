// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use wipecert_kernel::error::RegistryError;
use wipecert_persistence::PersistenceError;

use crate::events::CommitError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing caller identity (x-principal header)")]
    MissingCaller,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Recovery failed: {0}")]
    Recovery(String),
    #[error("Internal server error")]
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Registry(e) => e.kind(),
            EngineError::Persistence(PersistenceError::PayloadTooLarge { .. }) => "PayloadTooLarge",
            EngineError::Persistence(_) | EngineError::Io(_) => "Storage",
            EngineError::MissingCaller => "MissingCaller",
            EngineError::InvalidInput(_) => "InvalidInput",
            EngineError::Recovery(_) => "Recovery",
            EngineError::Internal => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Registry(e) => match e {
                RegistryError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                RegistryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                RegistryError::AlreadyExists(_) => StatusCode::CONFLICT,
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::AlreadyRevoked(_) => StatusCode::CONFLICT,
                RegistryError::ProtectedPrincipal(_) => StatusCode::FORBIDDEN,
                RegistryError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
                RegistryError::AlreadyInitialized => StatusCode::CONFLICT,
                RegistryError::NonMonotonicTime { .. } | RegistryError::Codec(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            EngineError::MissingCaller => StatusCode::UNAUTHORIZED,
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::Persistence(PersistenceError::PayloadTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            EngineError::Persistence(_)
            | EngineError::Io(_)
            | EngineError::Recovery(_)
            | EngineError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommitError> for EngineError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Rejected(e) => EngineError::Registry(e),
            CommitError::EventLog(e) => EngineError::Persistence(e),
            // Already logged by the committer. The in-memory state can no longer be trusted.
            CommitError::LiveApply(_) => EngineError::Internal,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
