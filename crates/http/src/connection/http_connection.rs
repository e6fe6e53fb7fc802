use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, Request, Response};

const CONNECTION: &str = "Connection";

/// An HTTP connection that reads requests and writes the handler's responses
///
/// Requests are served one after another until the peer closes the stream,
/// asks for `Connection: close`, sends something that can not be decoded or
/// stays silent longer than the read timeout.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    read_timeout: Option<Duration>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_decoder(reader, writer, RequestDecoder::new())
    }

    pub fn with_decoder(reader: R, writer: W, decoder: RequestDecoder) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            read_timeout: None,
        }
    }

    /// Bounds the time spent waiting for each request.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = Some(read_timeout);
        self
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            let next = match self.read_timeout {
                Some(read_timeout) => match tokio::time::timeout(read_timeout, self.framed_read.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!(timeout = ?read_timeout, "read request timeout");
                        self.send_response(Response::canned(StatusCode::REQUEST_TIMEOUT), false).await?;
                        return Ok(());
                    }
                },
                None => self.framed_read.next().await,
            };

            match next {
                Some(Ok(request)) => {
                    let keep_alive = request.keep_alive();
                    let response = self.do_process(request, &handler).await;
                    self.send_response(response, keep_alive).await?;
                    if !keep_alive {
                        return Ok(());
                    }
                }

                Some(Err(e)) => {
                    return match e.status_code() {
                        Some(status) => {
                            warn!(cause = %e, status = status.as_u16(), "can't decode request");
                            self.send_response(Response::canned(status), false).await?;
                            Err(e.into())
                        }
                        None => Err(e.into()),
                    };
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, request: Request, handler: &Arc<H>) -> Response
    where
        H: Handler,
    {
        match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let cause: Box<dyn Error + Send + Sync> = e.into();
                error!(%cause, "handle request error");
                Response::canned(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    async fn send_response(&mut self, mut response: Response, keep_alive: bool) -> Result<(), HttpError> {
        if !keep_alive {
            response.set_header(CONNECTION, "close");
        }
        self.framed_write.send(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
        if request.path() == "/fail" {
            return Err("store unavailable".into());
        }
        Ok(Response::new(StatusCode::OK).with_body("text/plain", request.path().to_string()))
    }

    async fn exchange(input: &'static [u8], read_timeout: Option<Duration>) -> String {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);

        let mut connection = HttpConnection::new(reader, writer);
        if let Some(read_timeout) = read_timeout {
            connection = connection.with_read_timeout(read_timeout);
        }
        let task = tokio::spawn(connection.process(Arc::new(make_handler(echo))));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(input).await.unwrap();
        if read_timeout.is_none() {
            client_write.shutdown().await.unwrap();
        }

        let mut output = String::new();
        client_read.read_to_string(&mut output).await.unwrap();
        let _ = task.await.unwrap();
        output
    }

    #[tokio::test]
    async fn serves_pipelined_requests() {
        let output = exchange(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\nConnection: close\r\n\r\n", None).await;

        let first = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\n/a";
        let second = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\n/b";
        assert_eq!(output, format!("{first}{second}"));
    }

    #[tokio::test]
    async fn bad_request_line_gets_400() {
        let output = exchange(b"GARBAGE\r\n\r\n", None).await;

        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(output.contains("Connection: close\r\n"));
        assert!(output.ends_with(r#"{"Message":"Bad Request"}"#));
    }

    #[tokio::test]
    async fn chunked_gets_411() {
        let output = exchange(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n", None).await;
        assert!(output.starts_with("HTTP/1.1 411 Length Required\r\n"));
    }

    #[tokio::test]
    async fn handler_error_gets_500() {
        let output = exchange(b"GET /fail HTTP/1.1\r\nConnection: close\r\n\r\n", None).await;
        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn silent_peer_gets_408() {
        let output = exchange(b"GET /slow HTTP/1.1\r\n", Some(Duration::from_millis(50))).await;

        assert!(output.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
        assert!(output.contains("Connection: close\r\n"));
    }
}
