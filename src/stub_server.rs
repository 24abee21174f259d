//! One-shot HTTP server for exercising the provider adapters over a real socket

use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// The request the server received
#[derive(Debug)]
pub struct RecordedRequest {
    pub request_line: String,
    headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Accepts a single connection, records the request and answers with a
/// canned status and JSON body.
pub struct StubServer {
    pub base_url: String,
    handle: JoinHandle<Result<RecordedRequest>>,
}

impl StubServer {
    pub async fn respond_once(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let address = listener.local_addr().expect("Stub server has no address");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.context("accept failed")?;
            let request = read_request(&mut stream).await?;

            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await?;
            stream.shutdown().await?;
            Ok::<_, anyhow::Error>(request)
        });

        Self {
            base_url: format!("http://{address}"),
            handle,
        }
    }

    /// Wait for the recorded request
    pub async fn request(self) -> RecordedRequest {
        self.handle
            .await
            .expect("Stub server task panicked")
            .expect("Stub server failed")
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(position) = find_header_end(&buffer) {
            break position;
        }
        let read = stream.read(&mut chunk).await?;
        anyhow::ensure!(read > 0, "connection closed before headers were complete");
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8(buffer[..header_end].to_vec())?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .map(|value| value.parse::<usize>())
        .transpose()?
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buffer.len() < body_start + content_length {
        let read = stream.read(&mut chunk).await?;
        anyhow::ensure!(read > 0, "connection closed before the body was complete");
        buffer.extend_from_slice(&chunk[..read]);
    }

    let body_bytes = &buffer[body_start..body_start + content_length];
    let body = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body_bytes)?
    };

    Ok(RecordedRequest {
        request_line,
        headers,
        body,
    })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
