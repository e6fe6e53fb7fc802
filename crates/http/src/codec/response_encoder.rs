use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{version_str, Response, SendError};

/// Writes a response in wire format: status line, headers in insertion order,
/// blank line and the body verbatim.
pub fn serialize(response: &Response) -> Bytes {
    let mut dst = BytesMut::with_capacity(estimate_size(response));
    write_response(response, &mut dst);
    dst.freeze()
}

fn estimate_size(response: &Response) -> usize {
    let headers: usize = response.headers().iter().map(|(name, value)| name.len() + value.len() + 4).sum();
    32 + response.reason().len() + headers + response.body().len()
}

fn write_response(response: &Response, dst: &mut BytesMut) {
    dst.put_slice(version_str(response.version()).as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(response.status().as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(response.reason().as_bytes());
    dst.put_slice(b"\r\n");

    for (name, value) in response.headers().iter() {
        dst.put_slice(name.as_bytes());
        dst.put_slice(b": ");
        dst.put_slice(value.as_bytes());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
    dst.put_slice(response.body());
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(estimate_size(&item));
        write_response(&item, dst);
        Ok(())
    }
}
