use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::error::HttpConnectionError;

/// Fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }
}

/// Sends a request and decodes a successful body as JSON.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Value, HttpConnectionError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, HttpConnectionError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(HttpConnectionError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpConnectionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url: response.url().to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(HttpConnectionError::from_reqwest)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| HttpConnectionError::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_success_decodes_json() {
        let base = serve_once("200 OK", r#"{"ok":true,"items":[1,2]}"#).await;
        let transport = ReqwestTransport::default();

        let mut request = HttpRequest::new(Method::GET, format!("{}/items", base));
        request.query.push(("page".to_string(), "1".to_string()));

        let value = transport.send(request).await.unwrap();
        assert_eq!(value, json!({"ok": true, "items": [1, 2]}));
    }

    #[tokio::test]
    async fn test_error_status() {
        let base = serve_once("404 Not Found", r#"{"error":"missing"}"#).await;
        let transport = ReqwestTransport::default();

        let err = transport
            .send(HttpRequest::new(Method::GET, format!("{}/missing", base)))
            .await
            .unwrap_err();
        match err {
            HttpConnectionError::Status { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let base = serve_once("200 OK", "<html>hello</html>").await;
        let transport = ReqwestTransport::default();

        let err = transport
            .send(HttpRequest::new(Method::GET, base))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpConnectionError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let base = serve_once("200 OK", "").await;
        let transport = ReqwestTransport::default();

        let value = transport
            .send(HttpRequest::new(Method::DELETE, base))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(5));
        let err = transport
            .send(HttpRequest::new(Method::GET, format!("http://{}/", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpConnectionError::Connect(_)));
    }
}
