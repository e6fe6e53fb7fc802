//! The structured request handed from the codec to the handlers.
//!
//! A [`Request`] is built once per inbound message by the codec. Afterwards it
//! is only touched to attach a decoded multipart payload or, through its
//! [`Extensions`], the data a gate in front of the handler resolved (route
//! parameters, the caller identity).

use std::collections::HashMap;
use std::fmt::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::{Extensions, Method, Version};
use mime::Mime;
use serde::de::DeserializeOwned;

use crate::protocol::version::version_str;
use crate::protocol::{FormData, HeaderFields};

#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    raw_query: Option<String>,
    query: HashMap<String, String>,
    version: Version,
    headers: HeaderFields,
    body: Bytes,
    form_data: Option<FormData>,
    extensions: Extensions,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub(crate) fn from_parts(method: Method, target: &str, version: Version, headers: HeaderFields, body: Bytes) -> Self {
        let (path, raw_query) = split_target(target);
        let query = raw_query.as_deref().map(parse_query).unwrap_or_default();
        Self {
            method,
            path,
            raw_query,
            query,
            version,
            headers,
            body,
            form_data: None,
            extensions: Extensions::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request-target without its query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string as received, without the leading `?`.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Deserializes the query string into `T`, percent-decoding keys and values.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(self.raw_query.as_deref().unwrap_or_default())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Whether the `Content-Type` announces any `multipart/*` body, well formed
    /// or not. Only `multipart/form-data` decodes; the rest are for the caller
    /// to reject.
    pub fn is_multipart(&self) -> bool {
        let Some(value) = self.content_type() else {
            return false;
        };
        match value.parse::<Mime>() {
            Ok(mime) => mime.type_() == mime::MULTIPART,
            Err(_) => value.get(..10).is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/")),
        }
    }

    /// Whether the connection should stay open after answering this request.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(value) if value.eq_ignore_ascii_case("close") => false,
            Some(value) if value.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version >= Version::HTTP_11,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, `None` when it is not valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn form_data(&self) -> Option<&FormData> {
        self.form_data.as_ref()
    }

    pub fn attach_form_data(&mut self, form_data: FormData) {
        self.form_data = Some(form_data);
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Writes the request back in wire format: request line, headers in their
    /// original order, blank line and the body verbatim.
    pub fn to_bytes(&self) -> Bytes {
        let mut target = self.path.clone();
        if let Some(query) = &self.raw_query {
            target.push('?');
            target.push_str(query);
        }

        let mut head = String::with_capacity(256);
        // writing into a String never fails
        let _ = write!(head, "{} {} {}\r\n", self.method, target, version_str(self.version));
        for (name, value) in self.headers.iter() {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("\r\n");

        let mut buf = BytesMut::with_capacity(head.len() + self.body.len());
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Builds a [`Request`] by hand, mostly useful for tests and clients.
///
/// # Example
///
/// ```
/// use http::Method;
/// use pixel_http::protocol::Request;
///
/// let request = Request::builder()
///     .method(Method::POST)
///     .uri("/user/create?source=web")
///     .header("Content-Type", "application/json")
///     .body(r#"{"username":"bob"}"#);
///
/// assert_eq!(request.path(), "/user/create");
/// assert_eq!(request.query_param("source"), Some("web"));
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    target: String,
    version: Version,
    headers: HeaderFields,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self { method: Method::GET, target: "/".to_string(), version: Version::HTTP_11, headers: HeaderFields::new() }
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(self, body: impl Into<Bytes>) -> Request {
        Request::from_parts(self.method, &self.target, self.version, self.headers, body.into())
    }
}

/// Splits a request-target at its first `?`.
pub(crate) fn split_target(target: &str) -> (String, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    }
}

/// Splits a raw query string on `&`, then every pair on its first `=`.
///
/// A key without `=` maps to an empty value and a repeated key keeps its last
/// value. Nothing is percent-decoded.
pub(crate) fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn split_target_at_first_question_mark() {
        assert_eq!(split_target("/a/b"), ("/a/b".to_string(), None));
        assert_eq!(split_target("/a?x=1?y=2"), ("/a".to_string(), Some("x=1?y=2".to_string())));
        assert_eq!(split_target("/a?"), ("/a".to_string(), Some(String::new())));
    }

    #[test]
    fn query_rules() {
        let query = parse_query("a=1&b&c=x=y&a=3&&d=");

        assert_eq!(query.get("a").map(String::as_str), Some("3"));
        assert_eq!(query.get("b").map(String::as_str), Some(""));
        assert_eq!(query.get("c").map(String::as_str), Some("x=y"));
        assert_eq!(query.get("d").map(String::as_str), Some(""));
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn query_as_struct() {
        #[derive(Deserialize)]
        struct Page {
            page: u32,
            name: String,
        }

        let request = Request::builder().uri("/list?page=2&name=a%20b").body(Bytes::new());
        let page: Page = request.query_as().unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.name, "a b");
        // the raw map is not decoded
        assert_eq!(request.query_param("name"), Some("a%20b"));
    }

    #[test]
    fn keep_alive_rules() {
        let http11 = Request::builder().body(Bytes::new());
        assert!(http11.keep_alive());

        let close = Request::builder().header("Connection", "close").body(Bytes::new());
        assert!(!close.keep_alive());

        let http10 = Request::builder().version(Version::HTTP_10).body(Bytes::new());
        assert!(!http10.keep_alive());

        let http10_keep = Request::builder().version(Version::HTTP_10).header("Connection", "Keep-Alive").body(Bytes::new());
        assert!(http10_keep.keep_alive());
    }

    #[test]
    fn multipart_detection() {
        let multipart = Request::builder().header("Content-Type", "multipart/form-data; boundary=xyz").body(Bytes::new());
        assert!(multipart.is_multipart());

        let mixed = Request::builder().header("Content-Type", "multipart/mixed; boundary=xyz").body(Bytes::new());
        assert!(mixed.is_multipart());

        let json = Request::builder().header("Content-Type", "application/json").body(Bytes::new());
        assert!(!json.is_multipart());

        let none = Request::builder().body(Bytes::new());
        assert!(!none.is_multipart());
    }

    #[test]
    fn to_bytes_keeps_header_order() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/x?a=1")
            .header("B", "2")
            .header("A", "1")
            .body("payload");

        assert_eq!(&request.to_bytes()[..], &b"POST /x?a=1 HTTP/1.1\r\nB: 2\r\nA: 1\r\n\r\npayload"[..]);
    }
}
