use criterion::{criterion_group, criterion_main, Criterion};
use futures::executor::block_on;
use http::StatusCode;
use pixel_http::codec::{parse, parse_form_data, serialize, RequestDecoder};
use pixel_http::connection::HttpConnection;
use pixel_http::handler::make_handler;
use pixel_http::protocol::{Request, Response};
use std::hint::black_box;
use std::{
    error::Error,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::Decoder;

const CREATE_REQUEST: &[u8] = b"POST /user/create HTTP/1.1\r\n\
Host: localhost:8082\r\n\
Content-Type: application/json\r\n\
Content-Length: 70\r\n\
Connection: close\r\n\
\r\n\
{\"username\":\"alice\",\"email\":\"alice@example.com\",\"password\":\"Secr3t!x\"}";

// Mock IO for benchmarking
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

async fn created(_req: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
    Ok(Response::canned(StatusCode::CREATED))
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_create_request", |b| {
        b.iter(|| black_box(parse(CREATE_REQUEST).unwrap()));
    });

    c.bench_function("decode_create_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = bytes::BytesMut::from(CREATE_REQUEST);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_serialize(c: &mut Criterion) {
    let response = Response::canned(StatusCode::OK)
        .with_body("application/json", r#"{"id":1,"username":"alice","email":"alice@example.com","is_active":true}"#);

    c.bench_function("serialize_json_response", |b| {
        b.iter(|| black_box(serialize(&response)));
    });
}

fn bench_multipart(c: &mut Criterion) {
    let avatar = vec![0xAB_u8; 64 * 1024];
    let mut body = Vec::new();
    body.extend_from_slice(b"--bench\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice\r\n");
    body.extend_from_slice(b"--bench\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"a.jpg\"\r\n\r\n");
    body.extend_from_slice(&avatar);
    body.extend_from_slice(b"\r\n--bench--\r\n");

    let request = Request::builder()
        .method(http::Method::PATCH)
        .uri("/user/update")
        .header("Content-Type", "multipart/form-data; boundary=bench")
        .body(body);

    c.bench_function("multipart_field_and_64k_file", |b| {
        b.iter(|| black_box(parse_form_data(&request).unwrap()));
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let handler = Arc::new(make_handler(created));

    c.bench_function("process_create_request", |b| {
        b.iter(|| {
            let mock_io = MockIO::new(CREATE_REQUEST.to_vec());
            let (reader, writer) = (mock_io.clone(), mock_io);
            let connection = HttpConnection::new(reader, writer);
            black_box(block_on(connection.process(Arc::clone(&handler))).unwrap());
        });
    });
}

criterion_group!(benches, bench_parse, bench_serialize, bench_multipart, bench_http_connection);
criterion_main!(benches);
