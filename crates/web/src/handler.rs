use std::sync::Arc;

use async_trait::async_trait;
use pixel_http::protocol::{Request, Response};

use crate::error::ApiError;

pub type HandlerResult = Result<Response, ApiError>;

/// An endpoint of the application.
///
/// `S` is the shared application state; it is handed to every invocation
/// together with the request, which by then carries its path parameters,
/// decoded form data and, on gated routes, the caller's identity.
#[async_trait]
pub trait RequestHandler<S>: Send + Sync {
    async fn invoke(&self, state: Arc<S>, req: Request) -> HandlerResult;
}

/// Adapts any `async fn(Arc<S>, Request) -> HandlerResult`.
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler { f }
}

#[async_trait]
impl<S, F, Fut> RequestHandler<S> for FnHandler<F>
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn invoke(&self, state: Arc<S>, req: Request) -> HandlerResult {
        (self.f)(state, req).await
    }
}
