//! Wire encoding and decoding of HTTP messages.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`parse`]: one complete message into a [`Request`](crate::protocol::Request)
//!   - [`RequestDecoder`]: frames messages on a connection by their
//!     `Content-Length` and hands each frame to [`parse`]
//!
//! - Response handling:
//!   - [`serialize`]: a [`Response`](crate::protocol::Response) into bytes
//!   - [`ResponseEncoder`]: the same output as a `tokio_util` encoder
//!
//! - Form data:
//!   - [`parse_form_data`]: decodes a `multipart/form-data` body
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use http::StatusCode;
//! use pixel_http::codec::{serialize, RequestDecoder};
//! use pixel_http::protocol::Response;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("DELETE /user/delete HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/user/delete");
//!
//! let bytes = serialize(&Response::canned(StatusCode::NO_CONTENT));
//! assert_eq!(&bytes[..], b"HTTP/1.1 204 No Content\r\n\r\n");
//! ```

mod multipart;
mod request_decoder;
mod response_encoder;

pub use multipart::decode_parts;
pub use multipart::parse_form_data;
pub use request_decoder::parse;
pub use request_decoder::RequestDecoder;
pub use request_decoder::DEFAULT_MAX_BODY_BYTES;
pub use request_decoder::MAX_HEADER_BYTES;
pub use response_encoder::serialize;
pub use response_encoder::ResponseEncoder;
