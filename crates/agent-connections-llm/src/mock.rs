use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::backend::{ChatSession, ModelBackend, ModelClient};
use crate::config::GenerationConfig;
use crate::error::GenerativeError;
use crate::session::ChatTurn;

/// Mock model backend for testing
#[derive(Clone)]
pub struct MockModelBackend {
    inner: Arc<RwLock<MockModelBackendInner>>,
}

struct MockModelBackendInner {
    models: Vec<String>,
    valid_keys: Option<Vec<String>>,
    list_error: Option<String>,
    send_error: Option<String>,
    responses: Vec<String>,
    response_index: usize,
    list_calls: Vec<String>,
    client_builds: Vec<(String, String)>,
    chat_starts: Vec<Vec<ChatTurn>>,
    sent_messages: Vec<String>,
    sent_keys: Vec<String>,
}

impl MockModelBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockModelBackendInner {
                models: vec!["models/mock-model".to_string()],
                valid_keys: None,
                list_error: None,
                send_error: None,
                responses: Vec::new(),
                response_index: 0,
                list_calls: Vec::new(),
                client_builds: Vec::new(),
                chat_starts: Vec::new(),
                sent_messages: Vec::new(),
                sent_keys: Vec::new(),
            })),
        }
    }

    /// Responses are returned in order; the last one repeats.
    pub fn set_responses(&self, responses: Vec<String>) {
        let mut inner = self.inner.write();
        inner.responses = responses;
        inner.response_index = 0;
    }

    pub fn set_response(&self, response: impl Into<String>) {
        self.set_responses(vec![response.into()]);
    }

    /// Only these keys pass `list_models`.
    pub fn set_valid_keys(&self, keys: Vec<String>) {
        self.inner.write().valid_keys = Some(keys);
    }

    pub fn set_list_error(&self, message: impl Into<String>) {
        self.inner.write().list_error = Some(message.into());
    }

    pub fn clear_list_error(&self) {
        self.inner.write().list_error = None;
    }

    pub fn set_send_error(&self, message: impl Into<String>) {
        self.inner.write().send_error = Some(message.into());
    }

    pub fn clear_send_error(&self) {
        self.inner.write().send_error = None;
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.inner.read().list_calls.clone()
    }

    pub fn client_build_count(&self) -> usize {
        self.inner.read().client_builds.len()
    }

    pub fn client_builds(&self) -> Vec<(String, String)> {
        self.inner.read().client_builds.clone()
    }

    pub fn chat_start_count(&self) -> usize {
        self.inner.read().chat_starts.len()
    }

    pub fn chat_starts(&self) -> Vec<Vec<ChatTurn>> {
        self.inner.read().chat_starts.clone()
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.inner.read().sent_messages.clone()
    }

    /// API key of the client each message was sent through.
    pub fn sent_keys(&self) -> Vec<String> {
        self.inner.read().sent_keys.clone()
    }

    fn next_response(&self) -> String {
        let mut inner = self.inner.write();
        if inner.responses.is_empty() {
            return "Mock response".to_string();
        }

        let response = inner.responses[inner.response_index].clone();
        if inner.response_index < inner.responses.len() - 1 {
            inner.response_index += 1;
        }
        response
    }
}

impl Default for MockModelBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for MockModelBackend {
    async fn list_models(&self, api_key: &str) -> Result<Vec<String>, GenerativeError> {
        let mut inner = self.inner.write();
        inner.list_calls.push(api_key.to_string());

        if let Some(ref message) = inner.list_error {
            return Err(GenerativeError::ListModels(message.clone()));
        }

        if let Some(ref keys) = inner.valid_keys {
            if !keys.iter().any(|k| k == api_key) {
                return Err(GenerativeError::ListModels("API key not valid".to_string()));
            }
        }

        Ok(inner.models.clone())
    }

    fn client(
        &self,
        api_key: &str,
        model: &str,
        _generation: &GenerationConfig,
    ) -> Result<Arc<dyn ModelClient>, GenerativeError> {
        self.inner
            .write()
            .client_builds
            .push((api_key.to_string(), model.to_string()));

        Ok(Arc::new(MockModelClient {
            backend: self.clone(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }))
    }
}

pub struct MockModelClient {
    backend: MockModelBackend,
    api_key: String,
    model: String,
}

impl ModelClient for MockModelClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn start_chat(&self, history: Vec<ChatTurn>) -> Result<Box<dyn ChatSession>, GenerativeError> {
        self.backend.inner.write().chat_starts.push(history.clone());
        Ok(Box::new(MockChatSession {
            backend: self.backend.clone(),
            api_key: self.api_key.clone(),
            history,
        }))
    }
}

pub struct MockChatSession {
    backend: MockModelBackend,
    api_key: String,
    history: Vec<ChatTurn>,
}

#[async_trait]
impl ChatSession for MockChatSession {
    fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    async fn send_message(&mut self, message: &str) -> Result<String, GenerativeError> {
        let send_error = {
            let mut inner = self.backend.inner.write();
            inner.sent_messages.push(message.to_string());
            inner.sent_keys.push(self.api_key.clone());
            inner.send_error.clone()
        };

        if let Some(error) = send_error {
            return Err(GenerativeError::Request(error));
        }

        let response = self.backend.next_response();
        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(response.clone()));
        Ok(response)
    }
}
