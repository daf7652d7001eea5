use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Only POST method is allowed")]
    MethodNotAllowed,

    #[error("{message}")]
    MalformedBody {
        message: &'static str,
        #[source]
        source: Option<axum::BoxError>,
    },

    #[error("Invalid {field}. Use form field 'file'")]
    MissingField { field: &'static str },

    #[error("Failed to create {}", path.display())]
    StorageCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn malformed(message: &'static str, source: impl Into<axum::BoxError>) -> Self {
        Self::MalformedBody {
            message,
            source: Some(source.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedBody { .. } | Self::MissingField { .. } => StatusCode::BAD_REQUEST,
            Self::StorageCreate { .. } | Self::StorageWrite { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Storage failures never expose the path or cause.
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageCreate { .. } => "Server error creating file".to_string(),
            Self::StorageWrite { .. } => "Server error saving file".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            error => error.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::StorageCreate { path, source } | Self::StorageWrite { path, source } => {
                tracing::error!(path = %path.display(), error = %source, "{}", self.user_message());
            }
            Self::MalformedBody {
                source: Some(source),
                ..
            } => {
                tracing::debug!(error = %source, "rejected upload body");
            }
            Self::Internal(message) => tracing::error!("{}", message),
            _ => {}
        }

        (self.status_code(), format!("{}\n", self.user_message())).into_response()
    }
}
