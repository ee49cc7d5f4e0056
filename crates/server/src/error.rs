#![forbid(unsafe_code)]

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scribe_service::{ErrorKind, ServiceError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// The blocking worker running the request panicked or was cancelled.
    Worker(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists | ErrorKind::TransactionConflict => StatusCode::CONFLICT,
        ErrorKind::NotAFolder
        | ErrorKind::UnknownProperty
        | ErrorKind::InvalidProperty
        | ErrorKind::InvalidStructure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DecodeFailure => StatusCode::BAD_REQUEST,
        ErrorKind::PartialRead | ErrorKind::Corrupt | ErrorKind::StorageFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Service(err) => (status_for(err.kind()), err.code(), err.to_string()),
            Self::Worker(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::StorageFailure.as_str(),
                detail.clone(),
            ),
        };
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }
        (status, Json(ErrorBody { code, message })).into_response()
    }
}
