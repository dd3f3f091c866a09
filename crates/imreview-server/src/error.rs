//! Mapping engine errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use imreview_core::{ErrorKind, FieldError, ReviewError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error("Missing or malformed bearer token")]
    Unauthenticated,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Stable status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidTransition
        | ErrorKind::AlreadyResolved
        | ErrorKind::AlreadySubmitted
        | ErrorKind::AlreadyAssigned
        | ErrorKind::DuplicateRequest
        | ErrorKind::NotReady
        | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::RoleNotApproved | ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Persistence | ErrorKind::Config | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Review(e) => status_for(e.kind()),
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Review(e) => ErrorBody {
                code: e.kind().code(),
                message: e.to_string(),
                fields: e.field_errors().to_vec(),
            },
            ApiError::Unauthenticated => ErrorBody {
                code: "unauthenticated",
                message: self.to_string(),
                fields: Vec::new(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request refused");
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
