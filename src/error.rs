use actix_web::{
    error::BlockingError,
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use diesel::r2d2::PoolError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::models::ApiResponse;
use crate::validation::FieldErrors;

/// Application error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid payload: {0}")]
    Validation(FieldErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not authenticated: {0}")]
    NotAuthenticated(&'static str),

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("Not found.")]
    NotFound,

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl From<DieselError> for ApiError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => ApiError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                ApiError::Integrity(info.message().to_owned())
            }
            e => ApiError::Database(e),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Integrity(_) => StatusCode::CONFLICT,
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Pool(_)
            | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        let message = match self {
            ApiError::Validation(errors) => return res.json(errors),
            ApiError::NotAuthenticated(detail) => {
                res.insert_header((header::WWW_AUTHENTICATE, "Token"));
                detail.to_string()
            }
            ApiError::BadRequest(detail) | ApiError::Integrity(detail) => detail.clone(),
            ApiError::PermissionDenied | ApiError::NotFound => self.to_string(),
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Pool(_)
            | ApiError::Blocking(_) => {
                log::error!("{}", self);
                "Internal server error".to_string()
            }
        };

        res.json(ApiResponse { message })
    }
}
