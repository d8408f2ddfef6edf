use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Asset not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Internal details stay in the logs.
        let body = match self {
            ApiError::InvalidArgument(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}
