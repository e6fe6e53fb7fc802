use std::time::Duration;

use indoc::indoc;
use pixel_web::config::Config;
use pixel_web::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start() -> std::net::SocketAddr {
    let mut config = Config::with_secrets("access-secret", "refresh-secret");
    config.server.read_timeout = Duration::from_millis(200);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::builder().config(config).build().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

async fn exchange(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.replace('\n', "\r\n").as_bytes()).await.unwrap();

    let mut output = String::new();
    stream.read_to_string(&mut output).await.unwrap();
    output
}

#[tokio::test]
async fn create_over_tcp() {
    let addr = start().await;
    let output = exchange(
        addr,
        indoc! {r#"
            POST /user/create HTTP/1.1
            Host: localhost
            Content-Type: application/json
            Content-Length: 70
            Connection: close

            {"username":"alice","email":"alice@example.com","password":"Secr3t!x"}"#},
    )
    .await;

    assert!(output.starts_with("HTTP/1.1 201 Created\r\n"), "{output}");
    assert!(output.contains("Connection: close\r\n"));
    assert!(output.contains("Date: "));
    assert!(output.contains(r#""username":"alice""#));
}

#[tokio::test]
async fn keep_alive_then_timeout() {
    let addr = start().await;
    let output = exchange(
        addr,
        indoc! {"
            GET /images/pic.jpg HTTP/1.1
            Host: localhost

        "},
    )
    .await;

    assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"), "{output}");
    assert!(output.contains("HTTP/1.1 408 Request Timeout\r\n"));
}

#[tokio::test]
async fn malformed_request_line() {
    let addr = start().await;
    let output = exchange(addr, "HELLO\n\n").await;

    assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{output}");
}
