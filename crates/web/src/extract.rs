//! Pulling typed input out of a request inside a handler.

use http::{Method, StatusCode};
use pixel_http::protocol::{FormData, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::request::RequestExt;

/// 405 unless the request uses `method`.
pub fn require_method(req: &Request, method: Method) -> Result<(), ApiError> {
    if *req.method() == method {
        Ok(())
    } else {
        Err(ApiError::status(StatusCode::METHOD_NOT_ALLOWED))
    }
}

/// Deserializes the JSON body, 400 when it does not fit `T`.
pub fn json_body<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    serde_json::from_slice(req.body()).map_err(|e| {
        debug!(cause = %e, path = req.path(), "can't decode json body");
        ApiError::bad_request("Invalid request body")
    })
}

/// The caller's identity, 401 when the auth gate did not resolve one.
pub fn identity(req: &Request) -> Result<&Identity, ApiError> {
    req.identity().ok_or(ApiError::status(StatusCode::UNAUTHORIZED))
}

/// The decoded multipart body, 400 when the request carried none.
pub fn form_data(req: &Request) -> Result<&FormData, ApiError> {
    req.form_data().ok_or_else(|| ApiError::bad_request("Expected multipart/form-data body"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        email: String,
        password: String,
    }

    #[test]
    fn method_check() {
        let req = Request::builder().method(Method::GET).uri("/user/create").body("");

        assert!(require_method(&req, Method::GET).is_ok());
        let e = require_method(&req, Method::POST).unwrap_err();
        assert_eq!(e.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn json() {
        let req = Request::builder().method(Method::POST).body(r#"{"email":"a@b.io","password":"x"}"#);
        let login: Login = json_body(&req).unwrap();
        assert_eq!(login, Login { email: "a@b.io".into(), password: "x".into() });

        let req = Request::builder().method(Method::POST).body("{");
        assert_eq!(json_body::<Login>(&req).unwrap_err().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_identity() {
        let req = Request::builder().uri("/user/me").body("");
        assert_eq!(identity(&req).unwrap_err().status_code(), StatusCode::UNAUTHORIZED);
    }
}
