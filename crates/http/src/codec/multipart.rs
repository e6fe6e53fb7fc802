//! `multipart/form-data` decoding.
//!
//! The whole body is already in memory, so parts are sliced out of it without
//! copying. Decoding is all-or-nothing: the first malformed part aborts it.

use bytes::Bytes;
use mime::Mime;
use tracing::trace;

use crate::ensure;
use crate::protocol::{FilePart, FormData, MultipartError, Request};

const CRLF: &[u8] = b"\r\n";
const PART_HEADER_END: &[u8] = b"\r\n\r\n";

/// Decodes the body of a `multipart/form-data` request.
///
/// # Errors
///
/// - [`MultipartError::InvalidContentType`] when the `Content-Type` is missing
///   or is not `multipart/form-data`
/// - [`MultipartError::MissingBoundary`] when it carries no `boundary`
/// - [`MultipartError::MissingFieldName`] for a part without a form-data
///   `Content-Disposition` name
/// - [`MultipartError::MalformedPart`] for a part that can not be delimited
pub fn parse_form_data(request: &Request) -> Result<FormData, MultipartError> {
    let content_type = request.content_type().ok_or(MultipartError::InvalidContentType)?;
    let mime = content_type.parse::<Mime>().map_err(|_| MultipartError::InvalidContentType)?;
    ensure!(
        mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA,
        MultipartError::InvalidContentType
    );

    let boundary = mime.get_param(mime::BOUNDARY).map(|name| name.as_str()).unwrap_or_default();
    ensure!(!boundary.is_empty(), MultipartError::MissingBoundary);

    decode_parts(request.body(), boundary)
}

/// Decodes a multipart body delimited by `boundary`.
pub fn decode_parts(body: &Bytes, boundary: &str) -> Result<FormData, MultipartError> {
    let mut form_data = FormData::new();

    let delimiter = format!("--{boundary}").into_bytes();
    let next_delimiter = [CRLF, delimiter.as_slice()].concat();

    let Some(first) = find(body, &delimiter) else {
        ensure!(body.iter().all(u8::is_ascii_whitespace), MultipartError::malformed_part("missing delimiter"));
        return Ok(form_data);
    };

    let mut pos = first + delimiter.len();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            break;
        }

        let line_end = find(rest, CRLF).ok_or_else(|| MultipartError::malformed_part("missing closing delimiter"))?;
        ensure!(
            rest[..line_end].iter().all(|b| *b == b' ' || *b == b'\t'),
            MultipartError::malformed_part("garbage after delimiter")
        );
        let part_start = pos + line_end + CRLF.len();

        let part_len = find(&body[part_start..], &next_delimiter)
            .ok_or_else(|| MultipartError::malformed_part("missing closing delimiter"))?;
        let part_end = part_start + part_len;

        decode_part(body.slice(part_start..part_end), &mut form_data)?;
        pos = part_end + next_delimiter.len();
    }

    Ok(form_data)
}

fn decode_part(part: Bytes, form_data: &mut FormData) -> Result<(), MultipartError> {
    let (head, content) = if part.starts_with(CRLF) {
        (&part[..0], part.slice(CRLF.len()..))
    } else {
        let index = find(&part, PART_HEADER_END).ok_or_else(|| MultipartError::malformed_part("missing header terminator"))?;
        (&part[..index], part.slice(index + PART_HEADER_END.len()..))
    };

    let disposition = part_headers(head)
        .find(|(name, _)| name.eq_ignore_ascii_case("content-disposition"))
        .map(|(_, value)| ContentDisposition::parse(value))
        .ok_or(MultipartError::MissingFieldName)?;
    ensure!(disposition.is_form_data, MultipartError::MissingFieldName);
    let name = disposition.name.filter(|name| !name.is_empty()).ok_or(MultipartError::MissingFieldName)?;

    match disposition.file_name.as_deref().map(base_name).filter(|file_name| !file_name.is_empty()) {
        Some(file_name) => {
            trace!(name = %name, file_name, size = content.len(), "decoded file part");
            form_data.push_file(name, FilePart::new(file_name, content));
        }
        None => {
            trace!(name = %name, "decoded field part");
            form_data.insert_field(name, String::from_utf8_lossy(&content).into_owned());
        }
    }

    Ok(())
}

fn part_headers(head: &[u8]) -> impl Iterator<Item = (&str, &str)> {
    std::str::from_utf8(head)
        .unwrap_or_default()
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim(), value.trim()))
}

/// Strips any client side directory from an uploaded file name.
fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ContentDisposition {
    is_form_data: bool,
    name: Option<String>,
    file_name: Option<String>,
}

impl ContentDisposition {
    /// Parses `form-data; name="field"; filename="a.png"`. Parameter values may
    /// be quoted, in which case `;` is allowed inside and `\` escapes.
    fn parse(value: &str) -> Self {
        let mut items = split_params(value).into_iter();
        let mut disposition = Self {
            is_form_data: items.next().is_some_and(|kind| kind.trim().eq_ignore_ascii_case("form-data")),
            ..Self::default()
        };

        for item in items {
            let Some((key, value)) = item.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                key if key.eq_ignore_ascii_case("name") => disposition.name = Some(value),
                key if key.eq_ignore_ascii_case("filename") => disposition.file_name = Some(value),
                _ => {}
            }
        }

        disposition
    }
}

fn split_params(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (index, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                items.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);
    items
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|value| value.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => result.extend(chars.next()),
            ch => result.push(ch),
        }
    }
    result
}
