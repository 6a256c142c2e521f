//! In-process HTTP/1.1 stub standing in for the Cloudflare API
//!
//! Every request is captured so tests can assert on method, path, headers
//! and body. Each connection serves exactly one request (`Connection: close`).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Request target including the query string
    pub target: String,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

type Responder = Arc<dyn Fn(&CapturedRequest) -> (u16, String) + Send + Sync>;

pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    /// Start a stub answering each request with `respond(request)`
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&CapturedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/client/v4", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(respond);

        let captured = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = captured.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    serve_one(stream, captured, responder).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_with_method(&self, method: &str) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

async fn serve_one(
    mut stream: TcpStream,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    responder: Responder,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let request = CapturedRequest {
        method,
        target,
        headers,
        body,
    };
    let (status, response_body) = responder(&request);
    captured.lock().unwrap().push(request);

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        response_body.len(),
        response_body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// A successful Cloudflare envelope around `result`
pub fn envelope(result: serde_json::Value) -> String {
    serde_json::json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
    })
    .to_string()
}

/// A failed Cloudflare envelope with a single error entry
pub fn error_envelope(code: i64, message: &str) -> String {
    serde_json::json!({
        "success": false,
        "errors": [{ "code": code, "message": message }],
        "messages": [],
        "result": null,
    })
    .to_string()
}
