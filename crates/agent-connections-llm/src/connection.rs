use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use agent_connections_core::{
    Action, ActionRegistry, Connection, ConnectionError, ConnectionSetup, CredentialStore,
    EnvFileCredentialStore, ParamType, Prompter, Result,
};

use crate::backend::{ChatSession, ModelBackend, ModelClient};
use crate::config::GenerativeTextConfig;
use crate::error::GenerativeError;
use crate::gemini::GeminiBackend;
use crate::session::{ChatTurn, parse_history};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerativeAction {
    GenerateText,
}

#[derive(Debug, Deserialize)]
struct GenerateTextArgs {
    prompt: String,
    system_instruction: String,
    #[serde(default)]
    history: Option<Value>,
}

fn api_error(err: impl std::fmt::Display) -> ConnectionError {
    ConnectionError::api(GenerativeTextConnection::NAME, err.to_string())
}

/// Text generation over a retained, multi-turn conversation.
///
/// The model client is built on first use and cached. The first
/// `generate-text` call starts a session seeded with its `history`; later calls
/// reuse that session and ignore `history`.
pub struct GenerativeTextConnection {
    config: GenerativeTextConfig,
    actions: ActionRegistry<GenerativeAction>,
    backend: Arc<dyn ModelBackend>,
    credentials: Arc<dyn CredentialStore>,
    client: Mutex<Option<Arc<dyn ModelClient>>>,
    session: tokio::sync::Mutex<Option<Box<dyn ChatSession>>>,
}

impl GenerativeTextConnection {
    pub fn new(config: &Value) -> Result<Self> {
        Self::with_backend(
            config,
            Arc::new(GeminiBackend::new()),
            Arc::new(EnvFileCredentialStore::default()),
        )
    }

    pub fn with_backend(
        config: &Value,
        backend: Arc<dyn ModelBackend>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        Self::from_config(Self::validate_config(config)?, backend, credentials)
    }

    pub fn from_config(
        config: GenerativeTextConfig,
        backend: Arc<dyn ModelBackend>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            actions: Self::register_actions()?,
            backend,
            credentials,
            client: Mutex::new(None),
            session: tokio::sync::Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GenerativeTextConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Turns exchanged so far; empty before the first `generate-text`.
    pub async fn session_history(&self) -> Vec<ChatTurn> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.history().to_vec())
            .unwrap_or_default()
    }

    /// Drops the retained conversation; the next call seeds a new one.
    pub async fn reset_session(&self) {
        *self.session.lock().await = None;
    }

    fn api_key(&self) -> Result<String> {
        self.credentials
            .get(&self.config.api_key_env)?
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConnectionError::config(format!(
                    "Gemini API key not found (expected `{}`)",
                    self.config.api_key_env
                ))
            })
    }

    fn model_client(&self) -> Result<Arc<dyn ModelClient>> {
        let mut cached = self.client.lock();
        if let Some(ref client) = *cached {
            return Ok(client.clone());
        }

        let api_key = self.api_key()?;
        let client = self
            .backend
            .client(&api_key, &self.config.model, &self.config.generation)
            .map_err(api_error)?;
        *cached = Some(client.clone());
        Ok(client)
    }

    async fn check_credentials(&self) -> Result<()> {
        let api_key = self.api_key()?;
        self.backend.list_models(&api_key).await.map_err(api_error)?;
        Ok(())
    }

    async fn store_and_verify(&self, api_key: &str) -> Result<()> {
        self.credentials.set(&self.config.api_key_env, api_key)?;
        self.backend.list_models(api_key).await.map_err(api_error)?;
        Ok(())
    }

    /// Drops the cached client and moves a retained conversation onto a client
    /// built with the current key.
    async fn rebind_session(&self) {
        *self.client.lock() = None;

        let mut session = self.session.lock().await;
        let Some(history) = session.as_ref().map(|s| s.history().to_vec()) else {
            return;
        };

        let rebound = self
            .model_client()
            .and_then(|client| client.start_chat(history).map_err(api_error));
        match rebound {
            Ok(chat) => *session = Some(chat),
            Err(e) => {
                warn!(error = %e, "Dropping chat session after reconfigure");
                *session = None;
            }
        }
    }

    async fn generate_text(&self, args: Map<String, Value>) -> Result<Value> {
        let args: GenerateTextArgs = serde_json::from_value(Value::Object(args))
            .map_err(|e| ConnectionError::invalid(e.to_string()))?;

        let client = self.model_client()?;
        let mut session = self.session.lock().await;

        if session.is_none() {
            let history = parse_history(args.history.unwrap_or(Value::Null))?;
            info!(model = %client.model(), turns = history.len(), "Starting chat session");
            let started = client
                .start_chat(history)
                .map_err(|e| api_error(format!("Text generation failed: {}", e)))?;
            *session = Some(started);
        } else if args.history.is_some() {
            debug!("Chat session already active, ignoring supplied history");
        }

        let Some(chat) = session.as_mut() else {
            return Err(api_error("Text generation failed: no chat session"));
        };

        let prompt = if args.system_instruction.is_empty() {
            args.prompt
        } else {
            format!("{}\n{}", args.system_instruction, args.prompt)
        };

        let text = chat
            .send_message(&prompt)
            .await
            .map_err(|e: GenerativeError| api_error(format!("Text generation failed: {}", e)))?;

        Ok(Value::String(text))
    }
}

impl ConnectionSetup for GenerativeTextConnection {
    type Config = GenerativeTextConfig;
    type ActionKind = GenerativeAction;

    const NAME: &'static str = "gemini";

    fn validate_config(config: &Value) -> Result<GenerativeTextConfig> {
        GenerativeTextConfig::from_value(config)
    }

    fn register_actions() -> Result<ActionRegistry<GenerativeAction>> {
        let mut registry = ActionRegistry::new();
        registry.register(
            Action::new("generate-text", "Generate text using Gemini models")
                .required(
                    "prompt",
                    ParamType::String,
                    "The input prompt for text generation",
                )
                .required(
                    "system_instruction",
                    ParamType::String,
                    "System prompt to guide the model",
                )
                .optional(
                    "history",
                    ParamType::Json,
                    "Chat history used to seed a new conversation",
                ),
            GenerativeAction::GenerateText,
        )?;
        Ok(registry)
    }
}

#[async_trait]
impl Connection for GenerativeTextConnection {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_llm_provider(&self) -> bool {
        true
    }

    fn actions(&self) -> Vec<&Action> {
        self.actions.actions()
    }

    async fn configure(&self, prompter: &dyn Prompter) -> bool {
        prompter.say("\nGEMINI API SETUP");

        if self.is_configured(false).await {
            prompter.say("\nGemini API is already configured.");
            match prompter.ask("Do you want to reconfigure? (y/n): ") {
                Ok(answer) if answer.trim().eq_ignore_ascii_case("y") => {}
                Ok(_) => return true,
                Err(e) => {
                    error!(error = %e, "Failed to read answer");
                    return false;
                }
            }
        }

        prompter.say("\nTo get your Gemini API credentials:");
        prompter.say("Go to https://ai.google.dev");

        let api_key = match prompter.ask("\nEnter your Gemini API key: ") {
            Ok(key) => key.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Failed to read API key");
                return false;
            }
        };

        if api_key.is_empty() {
            error!("Configuration failed: empty API key");
            return false;
        }

        match self.store_and_verify(&api_key).await {
            Ok(()) => {
                self.rebind_session().await;
                prompter.say("\nGemini API configuration successfully saved!");
                prompter.say(&format!(
                    "Your API key has been stored as {}.",
                    self.config.api_key_env
                ));
                true
            }
            Err(e) => {
                error!(error = %e, "Configuration failed");
                false
            }
        }
    }

    async fn is_configured(&self, verbose: bool) -> bool {
        match self.check_credentials().await {
            Ok(()) => true,
            Err(e) => {
                if verbose {
                    debug!(error = %e, "Configuration check failed");
                }
                false
            }
        }
    }

    async fn perform_action(&self, action_name: &str, args: Map<String, Value>) -> Result<Value> {
        let (action, kind) = self.actions.lookup(action_name)?;

        if !self.is_configured(true).await {
            return Err(ConnectionError::config("Gemini is not properly configured"));
        }

        action.check(&args)?;

        match kind {
            GenerativeAction::GenerateText => self.generate_text(args).await,
        }
    }
}
