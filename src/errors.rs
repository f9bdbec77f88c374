use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    StateError(String),

    #[error("Attempt was already submitted")]
    AlreadySubmitted,

    #[error("An active attempt already exists: {0}")]
    ActiveAttemptExists(String),

    #[error("Duplicate question content: {0}")]
    DuplicateContent(String),

    #[error("Could not source enough unique questions: got {obtained}/{required}")]
    InsufficientQuestions { obtained: usize, required: usize },

    #[error("Generation provider error: {0}")]
    ProviderError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::StateError(_) => "STATE_ERROR",
            AppError::AlreadySubmitted => "ALREADY_SUBMITTED",
            AppError::ActiveAttemptExists(_) => "ACTIVE_ATTEMPT_EXISTS",
            AppError::DuplicateContent(_) => "DUPLICATE_CONTENT",
            AppError::InsufficientQuestions { .. } => "INSUFFICIENT_QUESTIONS",
            AppError::ProviderError(_) => "PROVIDER_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: &'static str,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::StateError(_) => StatusCode::CONFLICT,
            AppError::AlreadySubmitted => StatusCode::CONFLICT,
            AppError::ActiveAttemptExists(_) => StatusCode::CONFLICT,
            AppError::DuplicateContent(_) => StatusCode::CONFLICT,
            AppError::InsufficientQuestions { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            error_code: self.error_code(),
            code: self.status_code().as_u16(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        // Unique-index violations carry server code 11000; the question pool
        // relies on this for its one-hash-per-question invariant.
        if let ErrorKind::Write(WriteFailure::WriteError(we)) = err.kind.as_ref() {
            if we.code == 11000 {
                return AppError::DuplicateContent(we.message.clone());
            }
        }
        AppError::DatabaseError(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AlreadySubmitted.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ValidationError("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ProviderError("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::InsufficientQuestions {
                obtained: 4,
                required: 10
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::InsufficientQuestions {
            obtained: 7,
            required: 10,
        };
        assert_eq!(
            err.to_string(),
            "Could not source enough unique questions: got 7/10"
        );
        assert_eq!(err.error_code(), "INSUFFICIENT_QUESTIONS");
    }
}
