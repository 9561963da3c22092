//! Gemini implementation of the model seams

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{ChatSession, ModelBackend, ModelClient};
use crate::config::GenerationConfig;
use crate::error::GenerativeError;
use crate::session::{ChatTurn, TurnRole};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self::with_base_url(GEMINI_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn list_models(&self, api_key: &str) -> Result<Vec<String>, GenerativeError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| GenerativeError::ListModels(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GenerativeError::ListModels(format!("{}: {}", status, body)));
            }

            let page: ModelList = response
                .json()
                .await
                .map_err(|e| GenerativeError::ListModels(e.to_string()))?;

            names.extend(page.models.into_iter().map(|m| m.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = names.len(), "Listed Gemini models");
        Ok(names)
    }

    fn client(
        &self,
        api_key: &str,
        model: &str,
        generation: &GenerationConfig,
    ) -> Result<Arc<dyn ModelClient>, GenerativeError> {
        Ok(Arc::new(GeminiModelClient {
            api_key: api_key.to_string(),
            model: model.to_string(),
            generation: generation.clone(),
        }))
    }
}

#[derive(Clone)]
pub struct GeminiModelClient {
    api_key: String,
    model: String,
    generation: GenerationConfig,
}

impl std::fmt::Debug for GeminiModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModelClient")
            .field("model", &self.model)
            .field("generation", &self.generation)
            .finish()
    }
}

impl GeminiModelClient {
    fn build_llm(&self) -> Result<Box<dyn llm::LLMProvider>, GenerativeError> {
        llm::builder::LLMBuilder::new()
            .backend(llm::builder::LLMBackend::Google)
            .model(&self.model)
            .api_key(&self.api_key)
            .temperature(self.generation.temperature)
            .top_p(self.generation.top_p)
            .top_k(self.generation.top_k)
            .max_tokens(self.generation.max_output_tokens)
            .build()
            .map_err(|e| GenerativeError::Client(e.to_string()))
    }
}

impl ModelClient for GeminiModelClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn start_chat(&self, history: Vec<ChatTurn>) -> Result<Box<dyn ChatSession>, GenerativeError> {
        Ok(Box::new(GeminiChatSession {
            client: self.clone(),
            history,
        }))
    }
}

pub struct GeminiChatSession {
    client: GeminiModelClient,
    history: Vec<ChatTurn>,
}

fn convert_turn(turn: &ChatTurn) -> llm::chat::ChatMessage {
    match turn.role {
        TurnRole::User => llm::chat::ChatMessage::user().content(turn.text()).build(),
        TurnRole::Model => llm::chat::ChatMessage::assistant()
            .content(turn.text())
            .build(),
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    async fn send_message(&mut self, message: &str) -> Result<String, GenerativeError> {
        let mut messages: Vec<llm::chat::ChatMessage> =
            self.history.iter().map(convert_turn).collect();
        messages.push(llm::chat::ChatMessage::user().content(message).build());

        let llm = self.client.build_llm()?;
        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| GenerativeError::Request(e.to_string()))?;

        let text = response.text().ok_or(GenerativeError::EmptyResponse)?;

        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(text.clone()));
        Ok(text)
    }
}
