//! Mapping engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tourney_core::{EngineError, ErrorKind};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error; renders as `{ "error": ... }` with a status chosen by [`ErrorKind`]
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    /// No usable `x-user-id` header
    Unauthenticated,
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Permission => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Engine(err) => err.client_message(),
            ApiError::Unauthenticated => "Missing or invalid x-user-id header".to_string(),
            ApiError::BadRequest(reason) => reason.clone(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Engine(err) = &self {
            if status.is_server_error() {
                tracing::error!(error = %err, "Engine failure");
            } else {
                tracing::debug!(error = %err, status = %status, "Request rejected");
            }
        }
        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
