use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use crate::error::HttpConnectionError;
use crate::transport::{HttpRequest, HttpTransport};

#[derive(Debug, Clone)]
enum MockReply {
    Json(Value),
    Timeout(String),
    Connect(String),
    Status(u16),
}

/// Mock transport for testing
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<RwLock<MockTransportInner>>,
}

struct MockTransportInner {
    reply: MockReply,
    requests: Vec<HttpRequest>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockTransportInner {
                reply: MockReply::Json(Value::Null),
                requests: Vec::new(),
            })),
        }
    }

    pub fn with_response(response: Value) -> Self {
        let mock = Self::new();
        mock.set_response(response);
        mock
    }

    pub fn set_response(&self, response: Value) {
        self.inner.write().reply = MockReply::Json(response);
    }

    pub fn set_timeout(&self, message: impl Into<String>) {
        self.inner.write().reply = MockReply::Timeout(message.into());
    }

    pub fn set_connect_error(&self, message: impl Into<String>) {
        self.inner.write().reply = MockReply::Connect(message.into());
    }

    pub fn set_status(&self, status: u16) {
        self.inner.write().reply = MockReply::Status(status);
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.read().requests.clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.inner.read().requests.last().cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, HttpConnectionError> {
        let mut inner = self.inner.write();
        let url = request.url.clone();
        inner.requests.push(request);

        match inner.reply.clone() {
            MockReply::Json(value) => Ok(value),
            MockReply::Timeout(message) => Err(HttpConnectionError::Timeout(message)),
            MockReply::Connect(message) => Err(HttpConnectionError::Connect(message)),
            MockReply::Status(status) => Err(HttpConnectionError::Status {
                status,
                reason: "Mock".to_string(),
                url,
            }),
        }
    }
}
