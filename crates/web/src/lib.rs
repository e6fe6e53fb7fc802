//! The application layer of the pixel server
//!
//! `pixel-http` turns bytes into requests; this crate decides what to answer.
//! Requests flow through the [`Dispatcher`]: the [`Router`] picks an endpoint
//! by path, multipart bodies are decoded, gated routes run the
//! [`AuthGate`](auth::AuthGate), and the endpoint's handler produces the
//! response.
//!
//! # Example
//!
//! ```no_run
//! use pixel_web::config::Config;
//! use pixel_web::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::with_secrets("access secret", "refresh secret");
//!     let server = Server::builder().config(config).build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! - [`router`]: ordered path patterns with typed placeholders
//! - [`auth`]: bearer tokens and the gate resolving them to an account
//! - [`lockout`]: throttling of password, activation code and reset token checks
//! - [`user`]: the account endpoints
//! - [`store`], [`mail`], [`media`]: the collaborators handlers persist and send through

pub mod app;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod lockout;
pub mod mail;
pub mod media;
pub mod responder;
pub mod router;
pub mod store;
pub mod user;

mod date;
mod handler;
mod request;
mod server;

pub use dispatcher::Dispatcher;
pub use error::ApiError;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::HandlerResult;
pub use handler::RequestHandler;
pub use request::PathParams;
pub use request::RequestExt;
pub use router::Router;
pub use server::init_tracing;
pub use server::Server;
pub use server::ServerBuilder;
pub use server::ServerError;
