use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_typed_multipart::TypedMultipartError;
use pdf_qa_core::QaError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("{0}")]
    Internal(String),
}

impl From<TypedMultipartError> for ApiError {
    fn from(err: TypedMultipartError) -> Self {
        warn!(reason = %err, "malformed upload form");
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        warn!(reason = %detail, "malformed json body");
        match rejection {
            JsonRejection::JsonDataError(_) => Self::UnprocessableEntity(detail),
            _ => Self::BadRequest(detail),
        }
    }
}

impl ApiError {
    pub fn from_upload(err: QaError) -> Self {
        Self::classify(err, "Error processing PDF")
    }

    pub fn from_ask(err: QaError) -> Self {
        Self::classify(err, "Error processing question")
    }

    fn classify(err: QaError, context: &str) -> Self {
        match err {
            QaError::Validation(message) => {
                warn!(reason = %message, "rejected request");
                Self::BadRequest(message)
            }
            QaError::UnknownDocument(_) => {
                warn!(reason = %err, "unknown document");
                Self::NotFound(err.to_string())
            }
            other => {
                error!(error = ?other, "{context}");
                Self::Internal(format!("{context}: {other}"))
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
