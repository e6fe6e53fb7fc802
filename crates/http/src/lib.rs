//! The protocol layer of the pixel server
//!
//! This crate turns bytes read from a connection into structured requests and
//! structured responses back into bytes. Everything above that, routing,
//! authentication and the account handlers, lives in `pixel-web`.
//!
//! # Features
//!
//! - Tolerant request parsing with ordered, case-insensitive headers
//! - Length-framed keep-alive connections on top of tokio
//! - `multipart/form-data` decoding into fields and files
//! - Canned status responses handed out as private copies
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use pixel_http::connection::HttpConnection;
//! use pixel_http::handler::make_handler;
//! use pixel_http::protocol::{Request, Response};
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     info!(port = 8082, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8082").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
//!     info!(path = request.path(), "receiving request");
//!     Ok(Response::canned(StatusCode::OK))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: one accepted stream, request after request
//! - [`protocol`]: request, response, header and form data types
//! - [`codec`]: wire encoding and decoding, multipart included
//! - [`handler`]: the trait the application implements
//!
//! # Limitations
//!
//! - HTTP/1.x framing only, bodies must carry a `Content-Length`
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Maximum header size: 8KB

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
