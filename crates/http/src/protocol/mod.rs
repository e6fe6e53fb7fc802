//! Protocol types shared by the codec, the connection loop and the handlers.
//!
//! # Architecture
//!
//! - **Requests** ([`request`]): [`Request`] as produced by the codec, plus
//!   [`RequestBuilder`] to assemble one by hand
//! - **Responses** ([`response`]): [`Response`] and the canned status
//!   responses, always handed out as private copies
//! - **Headers** ([`headers`]): [`HeaderFields`], ordered storage with
//!   case-insensitive lookup used by both message kinds
//! - **Form data** ([`form_data`]): [`FormData`] and [`FilePart`] filled by
//!   the multipart decoder
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Request parsing errors
//!   - [`MultipartError`]: `multipart/form-data` decoding errors
//!   - [`SendError`]: Response sending errors

mod error;
pub use error::HttpError;
pub use error::MultipartError;
pub use error::ParseError;
pub use error::SendError;

mod headers;
pub use headers::HeaderFields;

mod form_data;
pub use form_data::FilePart;
pub use form_data::FormData;

mod request;
pub use request::Request;
pub use request::RequestBuilder;
pub(crate) use request::parse_query;
pub(crate) use request::split_target;

mod response;
pub use response::Response;
pub use response::APPLICATION_JSON;
pub use response::CONTENT_LENGTH;
pub use response::CONTENT_TYPE;

mod version;
pub use version::parse_version;
pub use version::version_str;
