use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LINE API error {status}: {body}")]
    LineApi { status: StatusCode, body: String },
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match self {
            Error::InvalidSignature => StatusCode::BAD_REQUEST,
            Error::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::LineApi { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status_code, self.to_string()).into_response()
    }
}
