//! Conversion of handler return values into responses.
//!
//! Everything goes out as JSON: either a serialized value or a
//! `{"Message": ...}` object on top of the canned response of the status.

use http::StatusCode;
use pixel_http::protocol::{Response, APPLICATION_JSON};
use serde::Serialize;

use crate::error::ApiError;
use crate::handler::HandlerResult;

pub trait Responder {
    fn respond(self) -> HandlerResult;
}

/// A value serialized as the response body.
pub struct Json<T> {
    status: StatusCode,
    value: T,
}

impl<T: Serialize> Json<T> {
    pub fn ok(value: T) -> Self {
        Self::with_status(StatusCode::OK, value)
    }

    pub fn created(value: T) -> Self {
        Self::with_status(StatusCode::CREATED, value)
    }

    pub fn with_status(status: StatusCode, value: T) -> Self {
        Self { status, value }
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn respond(self) -> HandlerResult {
        let body = serde_json::to_vec(&self.value).map_err(ApiError::from)?;
        Ok(Response::canned(self.status).with_body(APPLICATION_JSON, body))
    }
}

/// A `{"Message": ...}` body under the given status.
pub struct Message {
    status: StatusCode,
    text: String,
}

impl Message {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { status: StatusCode::OK, text: text.into() }
    }
}

impl Responder for Message {
    fn respond(self) -> HandlerResult {
        Ok(Response::canned(self.status).with_message(&self.text))
    }
}

impl Responder for StatusCode {
    fn respond(self) -> HandlerResult {
        Ok(Response::canned(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body() {
        let response = Json::created(json!({"username": "alice"})).respond().unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("Content-Length"), Some("20"));
        assert_eq!(response.body_str(), Some(r#"{"username":"alice"}"#));
    }

    #[test]
    fn message_body() {
        let response = Message::ok("Activation code sent").respond().unwrap();
        assert_eq!(response.body_str(), Some(r#"{"Message":"Activation code sent"}"#));
    }

    #[test]
    fn bare_status() {
        let response = StatusCode::NO_CONTENT.respond().unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }
}
