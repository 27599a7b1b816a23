use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::models::Id;
use crate::repo::RepoError;

/// Failures surfaced by the nexio / user operations.
#[derive(thiserror::Error, Debug)]
pub enum NexioError {
    #[error("nexio {0} not found")]
    NexioNotFound(Id),
    #[error("failed to create nexio: {0}")]
    Creation(#[source] RepoError),
    #[error("failed to delete nexio: {0}")]
    Deletion(#[source] RepoError),
    #[error("failed to add comment: {0}")]
    Comment(#[source] RepoError),
    #[error("failed to create or update user: {0}")]
    UserUpdate(#[source] RepoError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl NexioError {
    /// Storage cause, if any.
    pub fn repo_error(&self) -> Option<&RepoError> {
        match self {
            NexioError::NexioNotFound(_) => None,
            NexioError::Creation(e)
            | NexioError::Deletion(e)
            | NexioError::Comment(e)
            | NexioError::UserUpdate(e)
            | NexioError::Repo(e) => Some(e),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("bad request: {0}")] BadRequest(String),
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                log::error!("storage error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<NexioError> for ApiError {
    fn from(e: NexioError) -> Self {
        match e {
            NexioError::NexioNotFound(_) => ApiError::NotFound,
            NexioError::Creation(inner)
            | NexioError::Deletion(inner)
            | NexioError::Comment(inner)
            | NexioError::UserUpdate(inner)
            | NexioError::Repo(inner) => inner.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
