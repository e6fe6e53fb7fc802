use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty request")]
    EmptyRequest,

    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("length required: chunked transfer-encoding is not supported")]
    LengthRequired,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status answered to the peer for this error, `None` when the
    /// connection itself is broken and nothing can be written back.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::EmptyRequest | Self::InvalidRequestLine { .. } | Self::InvalidContentLength { .. } => {
                Some(StatusCode::BAD_REQUEST)
            }
            Self::TooLargeHeader { .. } | Self::TooLargeBody { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            Self::LengthRequired => Some(StatusCode::LENGTH_REQUIRED),
            Self::Io { .. } => None,
        }
    }
}

/// Errors of the `multipart/form-data` decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    #[error("invalid Content-Type, expect multipart/form-data")]
    InvalidContentType,

    #[error("boundary not found in Content-Type")]
    MissingBoundary,

    #[error("invalid Content-Disposition: name not found")]
    MissingFieldName,

    #[error("malformed part: {reason}")]
    MalformedPart { reason: String },
}

impl MultipartError {
    pub fn malformed_part<S: ToString>(str: S) -> Self {
        Self::MalformedPart { reason: str.to_string() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MissingBoundary | Self::MissingFieldName | Self::MalformedPart { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
