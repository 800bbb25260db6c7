// One-shot HTTP server returning a canned response and capturing the request

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Direct client; proxy environment variables must not reroute loopback test traffic
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

/// Serve exactly one request. Returns the base URL and a handle resolving to what was received.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    serve_raw(canned(status, body.len(), body)).await
}

/// Like `serve_once`, but the connection closes before the declared body length is sent
pub async fn serve_truncated(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    serve_raw(canned(status, body.len() + 64, body)).await
}

fn canned(status: u16, content_length: usize, body: &str) -> String {
    format!(
        "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status, content_length, body
    )
}

async fn serve_raw(response: String) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head, body_start, content_length) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                break (head, pos + 4, content_length);
            }
            assert!(n > 0, "connection closed before headers");
        };
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        CapturedRequest { head, body }
    });

    (format!("http://{}", addr), handle)
}
