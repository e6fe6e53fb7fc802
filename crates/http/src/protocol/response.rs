//! Structured responses and the canned status prototypes.
//!
//! The canned responses are built once per process and never handed out by
//! reference: [`Response::canned`] always returns a private copy, so a handler
//! that sets a body or a header can never leak it into another request.

use bytes::Bytes;
use http::{StatusCode, Version};
use once_cell::sync::Lazy;

use crate::protocol::HeaderFields;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: HeaderFields,
    body: Bytes,
}

impl Response {
    /// An empty response with the canonical reason phrase of `status`.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: Version::HTTP_11,
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderFields::new(),
            body: Bytes::new(),
        }
    }

    /// A fresh copy of the canned response for `status`.
    ///
    /// Statuses outside the canned set get a response built on the fly in the
    /// same shape.
    pub fn canned(status: StatusCode) -> Self {
        CANNED
            .iter()
            .find(|prototype| prototype.status == status)
            .cloned()
            .unwrap_or_else(|| build_canned(status))
    }

    /// Builds every canned prototype now instead of on first use.
    pub fn prepare_canned() {
        Lazy::force(&CANNED);
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Sets a header, ignoring empty names or values.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if name.is_empty() || value.is_empty() {
            return;
        }
        self.headers.insert(name, value);
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replaces the body and keeps `Content-Length` in line with it.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.headers.insert(CONTENT_LENGTH, self.body.len().to_string());
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.set_header(CONTENT_TYPE, content_type);
        self.set_body(body);
        self
    }

    /// Replaces the body with `{"Message": "<message>"}`.
    pub fn with_message(self, message: &str) -> Self {
        self.with_body(APPLICATION_JSON, message_body("Message", message))
    }
}

const CANNED_STATUSES: [StatusCode; 16] = [
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::ACCEPTED,
    StatusCode::NO_CONTENT,
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::CONFLICT,
    StatusCode::LENGTH_REQUIRED,
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::UNSUPPORTED_MEDIA_TYPE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
];

static CANNED: Lazy<Vec<Response>> = Lazy::new(|| CANNED_STATUSES.into_iter().map(build_canned).collect());

fn build_canned(status: StatusCode) -> Response {
    let response = Response::new(status);
    if status == StatusCode::NO_CONTENT {
        return response;
    }

    let reason = status.canonical_reason().unwrap_or("Unknown");
    let key = if status.is_success() { "Status" } else { "Message" };
    response.with_body(APPLICATION_JSON, message_body(key, reason))
}

fn message_body(key: &str, message: &str) -> String {
    let mut object = serde_json::Map::new();
    object.insert(key.to_string(), serde_json::Value::from(message));
    serde_json::Value::Object(object).to_string()
}
