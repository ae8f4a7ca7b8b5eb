use std::{backtrace::Backtrace, fmt, io};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gallerist_core::{CatalogError, ProbeError};
use gallerist_model::ModelError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Only populated for 500s.
    pub stack: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stack: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            stack: Some(Backtrace::force_capture().to_string()),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn range_not_satisfiable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::RANGE_NOT_SATISFIABLE, message)
    }

    /// Map a filesystem error on a client-named path.
    pub fn file_access(err: &io::Error, what: impl fmt::Display) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(format!("{what} not found")),
            io::ErrorKind::PermissionDenied => {
                Self::forbidden(format!("{what} is not readable"))
            }
            _ => Self::internal(format!("failed to access {what}: {err}")),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), message = %self.message, "request failed");
        }
        let body = match self.stack {
            Some(stack) => json!({ "message": self.message, "stack": stack }),
            None => json!({ "message": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => Self::not_found(msg),
            CatalogError::InvalidRequest(msg) => Self::bad_request(msg),
            CatalogError::Io(ref source) => Self::file_access(source, "media file"),
            CatalogError::Enumeration { ref path, ref source } => {
                Self::file_access(source, path.display())
            }
            CatalogError::Image(_) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
            }
            CatalogError::Probe(ProbeError::Unsupported(_)) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
            }
            CatalogError::Probe(_) | CatalogError::Internal(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn internal_errors_carry_a_stack() {
        let response = AppError::internal("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "boom");
        assert!(json["stack"].is_string());
    }

    #[test]
    fn maps_catalog_errors_to_statuses() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            AppError::from(CatalogError::Io(denied)).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(CatalogError::NotFound("x".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ModelError::InvalidSort("sideways".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert!(AppError::bad_request("nope").stack.is_none());
    }
}
