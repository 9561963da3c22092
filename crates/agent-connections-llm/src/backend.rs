//! Seams between the connection and the generative model service

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::GenerativeError;
use crate::session::ChatTurn;

/// Entry point to a model service: key validation and client construction.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn list_models(&self, api_key: &str) -> Result<Vec<String>, GenerativeError>;

    fn client(
        &self,
        api_key: &str,
        model: &str,
        generation: &GenerationConfig,
    ) -> Result<Arc<dyn ModelClient>, GenerativeError>;
}

pub trait ModelClient: Send + Sync {
    fn model(&self) -> &str;

    fn start_chat(&self, history: Vec<ChatTurn>) -> Result<Box<dyn ChatSession>, GenerativeError>;
}

/// A conversation that accumulates turns as messages are exchanged.
#[async_trait]
pub trait ChatSession: Send {
    fn history(&self) -> &[ChatTurn];

    async fn send_message(&mut self, message: &str) -> Result<String, GenerativeError>;
}
