//! The error every handler returns and how it becomes a response.
//!
//! Client errors carry their status and message to the caller. Internal
//! failures are logged here and answered with the canned 500, so their detail
//! never reaches the wire.

use std::io;

use http::StatusCode;
use pixel_http::protocol::Response;
use thiserror::Error;
use tracing::error;

use crate::auth::token::TokenError;
use crate::mail::MailError;
use crate::store::StoreError;
use crate::user::validate::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Status(StatusCode),

    #[error("{status}: {message}")]
    Message { status: StatusCode, message: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("too many requests, {remaining_secs}s left")]
    TooManyRequests { remaining_secs: u64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("password hashing error: {reason}")]
    Password { reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ApiError {
    /// The canned response of `status`, unchanged.
    pub fn status(status: StatusCode) -> Self {
        Self::Status(status)
    }

    pub fn message<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Message { status, message: message.to_string() }
    }

    pub fn bad_request<S: ToString>(message: S) -> Self {
        Self::message(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized<S: ToString>(message: S) -> Self {
        Self::message(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found<S: ToString>(message: S) -> Self {
        Self::message(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict<S: ToString>(message: S) -> Self {
        Self::message(StatusCode::CONFLICT, message)
    }

    pub fn password<S: ToString>(reason: S) -> Self {
        Self::Password { reason: reason.to_string() }
    }

    pub fn too_many_requests(remaining_secs: u64) -> Self {
        Self::TooManyRequests { remaining_secs }
    }

    /// The status sent to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status(status) | Self::Message { status, .. } => *status,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) | Self::Mail(_) | Self::Token(_) | Self::Password { .. } | Self::Json(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Self::Status(status) => Response::canned(status),
            Self::Message { status, message } => Response::canned(status).with_message(&message),
            Self::Validation(errors) => Response::canned(StatusCode::BAD_REQUEST).with_message(&errors.to_string()),
            Self::TooManyRequests { remaining_secs } => Response::canned(StatusCode::TOO_MANY_REQUESTS)
                .with_message(&format!("Too many requests, timeout:{remaining_secs} seconds")),
            internal => {
                error!(cause = %internal, "internal error while handling request");
                Response::canned(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<ApiError> for Response {
    fn from(e: ApiError) -> Self {
        e.into_response()
    }
}
