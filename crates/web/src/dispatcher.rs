//! Glue between the connection loop and the application.
//!
//! For every request: resolve the route, decode a multipart body, run the
//! auth gate when the route asks for it, then call the endpoint. Whatever
//! comes back, success or error, leaves as a response with a `Date` header.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use pixel_http::codec::parse_form_data;
use pixel_http::handler::Handler;
use pixel_http::protocol::{Request, Response};
use tracing::{debug, info, warn};

use crate::auth::Authenticate;
use crate::date::{DateService, DATE};
use crate::router::Router;

pub struct Dispatcher<S> {
    router: Router<S>,
    state: Arc<S>,
    gate: Arc<dyn Authenticate>,
}

impl<S> Dispatcher<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(router: Router<S>, state: Arc<S>, gate: Arc<dyn Authenticate>) -> Self {
        Self { router, state, gate }
    }

    pub async fn dispatch(&self, mut req: Request) -> Response {
        let Some(matched) = self.router.at(req.path()) else {
            debug!(path = req.path(), "no route");
            return Response::canned(StatusCode::NOT_FOUND);
        };
        let endpoint = matched.endpoint();
        req.extensions_mut().insert(matched.into_params());

        if req.is_multipart() {
            match parse_form_data(&req) {
                Ok(form_data) => req.attach_form_data(form_data),
                Err(e) => {
                    warn!(cause = %e, path = req.path(), "can't decode multipart body");
                    return Response::canned(e.status_code());
                }
            }
        }

        if endpoint.requires_identity() {
            if let Some(identity) = self.gate.authenticate(&req).await {
                req.extensions_mut().insert(identity);
            }
        }

        match endpoint.handler().invoke(Arc::clone(&self.state), req).await {
            Ok(response) => response,
            Err(e) => {
                debug!(cause = %e, endpoint = endpoint.name(), "handler returned error");
                e.into_response()
            }
        }
    }
}

#[async_trait]
impl<S> Handler for Dispatcher<S>
where
    S: Send + Sync + 'static,
{
    type Error = Infallible;

    async fn call(&self, req: Request) -> Result<Response, Self::Error> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();

        let mut response = self.dispatch(req).await;
        response.set_header(DATE, DateService::global().http_date());

        info!(
            %method,
            %path,
            status = response.status().as_u16(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "request handled"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::handler::{handler_fn, HandlerResult};
    use crate::request::RequestExt;
    use crate::router::Endpoint;
    use crate::store::Account;
    use http::Method;
    use pixel_http::protocol::APPLICATION_JSON;

    /// Lets through any request carrying `Authorization: Bearer ok`.
    struct FixedGate;

    #[async_trait]
    impl Authenticate for FixedGate {
        async fn authenticate(&self, req: &Request) -> Option<Identity> {
            (req.header("Authorization") == Some("Bearer ok"))
                .then(|| Identity { account: Account { id: 9, username: "alice".into(), ..Account::default() } })
        }
    }

    async fn describe(_state: Arc<()>, req: Request) -> HandlerResult {
        let id = req.path_params().get("ID").unwrap_or("-").to_string();
        let who = req.identity().map_or("anonymous".to_string(), |identity| identity.account.username.clone());
        let fields = req.form_data().map_or(0, |form_data| form_data.fields().len());
        Ok(Response::canned(StatusCode::OK).with_body(APPLICATION_JSON, format!(r#"["{id}","{who}",{fields}]"#)))
    }

    fn dispatcher() -> Dispatcher<()> {
        let router = Router::builder()
            .route("/user/get/{int:ID}", Endpoint::new("get", handler_fn(describe)))
            .route("/user/me", Endpoint::new("me", handler_fn(describe)).with_identity())
            .route("/user/update", Endpoint::new("update", handler_fn(describe)))
            .build()
            .unwrap();
        Dispatcher::new(router, Arc::new(()), Arc::new(FixedGate))
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let response = dispatcher().call(Request::builder().uri("/nope").body("")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_str(), Some(r#"{"Message":"Not Found"}"#));
        assert!(response.header("Date").is_some());
    }

    #[tokio::test]
    async fn params_reach_handler() {
        let response = dispatcher().call(Request::builder().uri("/user/get/42").body("")).await.unwrap();
        assert_eq!(response.body_str(), Some(r#"["42","anonymous",0]"#));
    }

    #[tokio::test]
    async fn identity_only_on_gated_routes() {
        let gated = Request::builder().uri("/user/me").header("Authorization", "Bearer ok").body("");
        let response = dispatcher().call(gated).await.unwrap();
        assert_eq!(response.body_str(), Some(r#"["-","alice",0]"#));

        let open = Request::builder().uri("/user/get/1").header("Authorization", "Bearer ok").body("");
        let response = dispatcher().call(open).await.unwrap();
        assert_eq!(response.body_str(), Some(r#"["1","anonymous",0]"#));
    }

    #[tokio::test]
    async fn multipart_is_decoded_before_the_handler() {
        let body = "--xyz\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nbob\r\n--xyz--\r\n";
        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/user/update")
            .header("Content-Type", "multipart/form-data; boundary=xyz")
            .body(body);

        let response = dispatcher().call(req).await.unwrap();
        assert_eq!(response.body_str(), Some(r#"["-","anonymous",1]"#));
    }

    #[tokio::test]
    async fn broken_multipart_never_reaches_handler() {
        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/user/update")
            .header("Content-Type", "multipart/form-data")
            .body("--xyz\r\n");

        let response = dispatcher().call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_form_multipart_is_415() {
        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/user/me")
            .header("Content-Type", "multipart/mixed; boundary=xyz")
            .header("Authorization", "Bearer ok")
            .body("--xyz\r\n\r\nhello\r\n--xyz--\r\n");

        let response = dispatcher().call(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.body_str(), Some(r#"{"Message":"Unsupported Media Type"}"#));
    }
}
