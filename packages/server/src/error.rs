use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::ingest::IngestError;
use crate::repository::RepositoryError;

/// Structured error response returned by all endpoints on failure.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `MissingFile`, `TooLarge`,
    /// `UnsupportedType`, `LengthMismatch`, `ContentMismatch`, `InvalidFolder`,
    /// `TransportError`, `StorageError`, `RepositoryError`, `InternalError`.
    #[schema(example = "TooLarge")]
    pub error: &'static str,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "file is 12582912 bytes, the limit is 5242880 bytes")]
    pub details: Option<String>,
    /// Identifier of a stored asset left without a metadata record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// URL of a stored asset left without a metadata record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ErrorBody {
    fn new(error: &'static str, details: impl Into<String>) -> Self {
        Self {
            error,
            details: Some(details.into()),
            identifier: None,
            url: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed multipart body or an aborted transfer.
    Transport(String),
    Ingest(IngestError),
    Repository(RepositoryError),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Transport(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("TransportError", msg),
            ),
            AppError::Ingest(IngestError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(e.code(), e.to_string()))
            }
            AppError::Ingest(IngestError::Storage(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("StorageError", e.to_string()),
            ),
            AppError::Ingest(IngestError::Metadata { asset, source }) => {
                tracing::error!(
                    identifier = %asset.identifier,
                    url = %asset.url,
                    "Stored asset has no metadata record: {}",
                    source
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "RepositoryError",
                        details: Some(source.to_string()),
                        identifier: Some(asset.identifier),
                        url: Some(asset.url),
                    },
                )
            }
            AppError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("RepositoryError", e.to_string()),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "InternalError",
                        details: None,
                        identifier: None,
                        url: None,
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}
