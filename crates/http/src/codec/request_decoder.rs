//! Request decoding.
//!
//! Two layers live here:
//!
//! - [`parse`] turns one complete request message into a [`Request`]. It is
//!   tolerant: header lines it cannot split are skipped, and the body is
//!   everything after the blank line.
//! - [`RequestDecoder`] frames messages on a connection. It waits for the end
//!   of the header block and for `Content-Length` body bytes, then hands exactly
//!   that frame to [`parse`].
//!
//! # Example
//!
//! ```
//! use pixel_http::codec::parse;
//!
//! let request = parse(&b"GET /user/get/42?full=1 HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]).unwrap();
//!
//! assert_eq!(request.path(), "/user/get/42");
//! assert_eq!(request.query_param("full"), Some("1"));
//! assert_eq!(request.header("host"), Some("localhost"));
//! ```

use bytes::{Buf, Bytes, BytesMut};
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{parse_version, HeaderFields, ParseError, Request};

/// Maximum size in bytes allowed for the request line plus the header block
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Body limit used by [`RequestDecoder::new`]
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parses one complete request message.
///
/// # Errors
///
/// - [`ParseError::EmptyRequest`] for an empty buffer
/// - [`ParseError::InvalidRequestLine`] when the first line is not exactly
///   `METHOD SP TARGET SP VERSION` with a valid method and a known version
pub fn parse(buf: impl Into<Bytes>) -> Result<Request, ParseError> {
    let buf = buf.into();
    ensure!(!buf.is_empty(), ParseError::EmptyRequest);

    let mut lines = CrlfLines::new(&buf);
    let (request_line, _) = lines.next().ok_or(ParseError::EmptyRequest)?;
    let (method, target, version) = parse_request_line(request_line)?;

    let mut headers = HeaderFields::new();
    let mut body_start = buf.len();
    for (line, next) in lines.by_ref() {
        if line.is_empty() {
            body_start = next;
            break;
        }

        match std::str::from_utf8(line).ok().and_then(|line| line.split_once(": ")) {
            Some((name, value)) => {
                headers.insert_if_absent(name, value);
            }
            None => trace!(line = %String::from_utf8_lossy(line), "skip malformed header line"),
        }
    }

    Ok(Request::from_parts(method, target, version, headers, buf.slice(body_start..)))
}

fn parse_request_line(line: &[u8]) -> Result<(Method, &str, http::Version), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_request_line("request line is not utf-8"))?;

    let tokens: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = tokens[..] else {
        return Err(ParseError::invalid_request_line(format!("expect 3 tokens, found {}", tokens.len())));
    };
    ensure!(
        !method.is_empty() && !target.is_empty() && !version.is_empty(),
        ParseError::invalid_request_line("empty token")
    );

    let method =
        Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::invalid_request_line(format!("bad method {method}")))?;
    let version = parse_version(version).ok_or_else(|| ParseError::invalid_request_line(format!("bad version {version}")))?;

    Ok((method, target, version))
}

/// Iterates over the CRLF separated lines of a buffer.
///
/// Yields each line without its terminator together with the offset right
/// after it. The text after the last CRLF is yielded as a final line, even
/// when it is empty.
struct CrlfLines<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> CrlfLines<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, done: false }
    }
}

impl<'a> Iterator for CrlfLines<'a> {
    type Item = (&'a [u8], usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.buf[self.pos..];
        match find(rest, CRLF) {
            Some(index) => {
                let line = &rest[..index];
                self.pos += index + CRLF.len();
                Some((line, self.pos))
            }
            None => {
                self.done = true;
                self.pos = self.buf.len();
                Some((rest, self.pos))
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Frames requests out of a connection buffer.
///
/// Empty lines in front of a request line are skipped. A request announcing
/// `Transfer-Encoding: chunked` is refused with [`ParseError::LengthRequired`].
#[derive(Debug, Clone, Copy)]
pub struct RequestDecoder {
    max_body_bytes: usize,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_max_body_bytes(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// # Returns
    ///
    /// - `Ok(Some(request))`: one whole message was consumed from `src`
    /// - `Ok(None)`: need more data
    /// - `Err(_)`: the message can not be framed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.starts_with(CRLF) {
            src.advance(CRLF.len());
        }
        if src.is_empty() {
            return Ok(None);
        }

        let Some(header_end) = find(src, HEADER_END).map(|index| index + HEADER_END.len()) else {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        };
        ensure!(header_end <= MAX_HEADER_BYTES, ParseError::too_large_header(header_end, MAX_HEADER_BYTES));

        let body_len = body_length(&src[..header_end])?;
        ensure!(body_len <= self.max_body_bytes, ParseError::too_large_body(body_len, self.max_body_bytes));

        let frame_len = header_end + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        trace!(header_size = header_end, body_size = body_len, "framed request");
        parse(src.split_to(frame_len).freeze()).map(Some)
    }

    /// At end of stream whatever is left is parsed as it is.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }

        if src.iter().all(u8::is_ascii_whitespace) {
            src.clear();
            return Ok(None);
        }

        trace!(size = src.len(), "parse truncated request at eof");
        parse(src.split().freeze()).map(Some)
    }
}

/// Reads the body length announced by a header block, the first
/// `Content-Length` wins. No header means no body.
fn body_length(head: &[u8]) -> Result<usize, ParseError> {
    let mut content_length = None;
    for (line, _) in CrlfLines::new(head).skip(1) {
        let Some((name, value)) = std::str::from_utf8(line).ok().and_then(|line| line.split_once(':')) else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("transfer-encoding") && is_chunked(value) {
            return Err(ParseError::LengthRequired);
        }

        if name.eq_ignore_ascii_case("content-length") && content_length.is_none() {
            let length = value.parse::<usize>().map_err(|_| ParseError::invalid_content_length(value))?;
            content_length = Some(length);
        }
    }

    Ok(content_length.unwrap_or(0))
}

fn is_chunked(transfer_encoding: &str) -> bool {
    transfer_encoding.split(',').any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
}
