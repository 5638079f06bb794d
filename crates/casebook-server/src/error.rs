use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use casebook_core::CasebookError;
use casebook_store::StoreError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => {
                tracing::error!("{}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<CasebookError> for AppError {
    fn from(err: CasebookError) -> Self {
        let message = err.to_string();
        match err {
            CasebookError::NotFound(_) => AppError::NotFound(message),
            CasebookError::InvalidInput(_) | CasebookError::Json(_) => AppError::BadRequest(message),
            CasebookError::Cancelled => AppError::Conflict(message),
            CasebookError::Timeout(_) => AppError::GatewayTimeout(message),
            CasebookError::Http(_)
            | CasebookError::Extraction(_)
            | CasebookError::Ocr(_)
            | CasebookError::Analysis(_) => AppError::BadGateway(message),
            CasebookError::Io(_) | CasebookError::Config(_) | CasebookError::Storage(_) => {
                AppError::Internal(message)
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        CasebookError::from(err).into()
    }
}
