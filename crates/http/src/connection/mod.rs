//! Connection handling.
//!
//! [`HttpConnection`] drives one accepted stream: it decodes requests with the
//! [`RequestDecoder`](crate::codec::RequestDecoder), hands them to a
//! [`Handler`](crate::handler::Handler) and encodes the responses back.
//!
//! Failures never tear the process down:
//!
//! - undecodable input is answered with the matching canned status (400, 411
//!   or 413) and the connection is closed
//! - a peer that stays silent past the read timeout gets a 408
//! - a handler error is logged and answered with a 500

mod http_connection;

pub use http_connection::HttpConnection;
