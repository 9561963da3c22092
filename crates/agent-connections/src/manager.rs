//! Building connections from an agent configuration and routing actions to them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use agent_connections_core::{
    Action, Connection, ConnectionError, CredentialStore, EnvFileCredentialStore, Prompter, Result,
};
use agent_connections_http::{HttpConnection, HttpTransport};
use agent_connections_llm::{GeminiBackend, GenerativeTextConnection, ModelBackend};

/// Agent configuration document.
///
/// ```yaml
/// name: example_agent
/// config:
///   - name: gemini
///     model: gemini-2.0-flash
///   - name: http
///     base_url: https://api.example.com
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub config: Vec<ConnectionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    /// Connection type, also used as the registered name.
    pub name: String,

    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl AgentConfig {
    /// Parses YAML; JSON documents are accepted as well.
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str(source)
            .map_err(|e| ConnectionError::config(format!("invalid agent configuration: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ConnectionError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&source)
    }
}

/// Creates connections by type name, sharing one credential store and model
/// backend across them.
pub struct ConnectionFactory {
    credentials: Arc<dyn CredentialStore>,
    model_backend: Arc<dyn ModelBackend>,
    http_transport: Option<Arc<dyn HttpTransport>>,
}

impl ConnectionFactory {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            model_backend: Arc::new(GeminiBackend::new()),
            http_transport: None,
        }
    }

    pub fn with_model_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.model_backend = backend;
        self
    }

    /// Without a transport each HTTP connection builds its own reqwest client.
    pub fn with_http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = Some(transport);
        self
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        self.credentials.clone()
    }

    pub fn create(&self, kind: &str, config: &Value) -> Result<Arc<dyn Connection>> {
        match kind {
            "http" | "custom" => {
                let connection = match self.http_transport {
                    Some(ref transport) => HttpConnection::with_transport(config, transport.clone())?,
                    None => HttpConnection::new(config)?,
                };
                Ok(Arc::new(connection))
            }
            "gemini" => Ok(Arc::new(GenerativeTextConnection::with_backend(
                config,
                self.model_backend.clone(),
                self.credentials.clone(),
            )?)),
            other => Err(ConnectionError::config(format!(
                "Unknown connection type: {}",
                other
            ))),
        }
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self::new(Arc::new(EnvFileCredentialStore::default()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub name: String,
    pub configured: bool,
    pub is_llm_provider: bool,
}

/// Named connections in registration order.
#[derive(Default)]
pub struct ConnectionManager {
    connections: Vec<(String, Arc<dyn Connection>)>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.names())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AgentConfig, factory: &ConnectionFactory) -> Result<Self> {
        let mut manager = Self::new();
        for entry in &config.config {
            let settings = Value::Object(entry.settings.clone());
            let connection = factory.create(&entry.name, &settings)?;
            manager.register(entry.name.clone(), connection)?;
        }

        info!(
            agent = config.name.as_deref().unwrap_or("unnamed"),
            connections = manager.len(),
            "Loaded connections"
        );
        Ok(manager)
    }

    pub fn register(&mut self, name: impl Into<String>, connection: Arc<dyn Connection>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(ConnectionError::config(format!(
                "Connection already registered: {}",
                name
            )));
        }

        debug!(connection = %name, "Registered connection");
        self.connections.push((name, connection));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
    }

    fn require(&self, name: &str) -> Result<Arc<dyn Connection>> {
        self.get(name)
            .ok_or_else(|| ConnectionError::UnknownConnection(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.connections.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub async fn list_connections(&self) -> Vec<ConnectionStatus> {
        let mut statuses = Vec::with_capacity(self.connections.len());
        for (name, connection) in &self.connections {
            statuses.push(ConnectionStatus {
                name: name.clone(),
                configured: connection.is_configured(false).await,
                is_llm_provider: connection.is_llm_provider(),
            });
        }
        statuses
    }

    pub fn list_actions(&self, connection: &str) -> Result<Vec<Action>> {
        Ok(self
            .require(connection)?
            .actions()
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn configure_connection(
        &self,
        connection: &str,
        prompter: &dyn Prompter,
    ) -> Result<bool> {
        let connection = self.require(connection)?;
        Ok(connection.configure(prompter).await)
    }

    pub async fn perform_action(
        &self,
        connection: &str,
        action: &str,
        args: Map<String, Value>,
    ) -> Result<Value> {
        let target = self.require(connection)?;
        debug!(connection, action, "Routing action");
        target.perform_action(action, args).await
    }

    /// First registered text-generation connection that is ready for use.
    pub async fn llm_provider(&self) -> Option<Arc<dyn Connection>> {
        for (_, connection) in &self.connections {
            if connection.is_llm_provider() && connection.is_configured(false).await {
                return Some(connection.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_connections_core::{InMemoryCredentialStore, ScriptedPrompter};
    use agent_connections_http::mock::MockTransport;
    use agent_connections_llm::mock::MockModelBackend;
    use serde_json::json;

    const AGENT_YAML: &str = r#"
name: example_agent
config:
  - name: gemini
    model: gemini-2.0-flash
    generation:
      temperature: 0.5
  - name: http
    base_url: https://api.example.com/
"#;

    struct Fixture {
        transport: MockTransport,
        backend: MockModelBackend,
        credentials: Arc<InMemoryCredentialStore>,
    }

    impl Fixture {
        fn new(credentials: InMemoryCredentialStore) -> Self {
            Self {
                transport: MockTransport::with_response(json!({ "ok": true })),
                backend: MockModelBackend::new(),
                credentials: Arc::new(credentials),
            }
        }

        fn configured() -> Self {
            Self::new(InMemoryCredentialStore::new().with("GEMINI_API_KEY", "test-key"))
        }

        fn factory(&self) -> ConnectionFactory {
            ConnectionFactory::new(self.credentials.clone())
                .with_model_backend(Arc::new(self.backend.clone()))
                .with_http_transport(Arc::new(self.transport.clone()))
        }

        fn manager(&self, yaml: &str) -> Result<ConnectionManager> {
            let config = AgentConfig::from_yaml(yaml)?;
            ConnectionManager::from_config(&config, &self.factory())
        }
    }

    #[test]
    fn test_parse_agent_config() {
        let config = AgentConfig::from_yaml(AGENT_YAML).unwrap();
        assert_eq!(config.name.as_deref(), Some("example_agent"));
        assert_eq!(config.config.len(), 2);
        assert_eq!(config.config[0].name, "gemini");
        assert_eq!(config.config[0].settings["model"], json!("gemini-2.0-flash"));
        assert_eq!(config.config[1].settings["base_url"], json!("https://api.example.com/"));
    }

    #[test]
    fn test_parse_json_agent_config() {
        let config =
            AgentConfig::from_yaml(r#"{"config": [{"name": "custom", "base_url": "http://x"}]}"#)
                .unwrap();
        assert!(config.name.is_none());
        assert_eq!(config.config[0].name, "custom");
    }

    #[test]
    fn test_load_agent_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        std::fs::write(&path, AGENT_YAML).unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.config.len(), 2);

        let err = AgentConfig::from_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_manager_from_config() {
        let fixture = Fixture::configured();
        let manager = fixture.manager(AGENT_YAML).unwrap();

        assert_eq!(manager.names(), vec!["gemini", "http"]);
        assert!(manager.get("gemini").unwrap().is_llm_provider());
        assert!(!manager.get("http").unwrap().is_llm_provider());
        assert!(manager.get("slack").is_none());
    }

    #[test]
    fn test_unknown_connection_type() {
        let fixture = Fixture::configured();
        let err = fixture
            .manager("config:\n  - name: twitter\n    api_key: x\n")
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("twitter"));
    }

    #[test]
    fn test_duplicate_connection_names() {
        let fixture = Fixture::configured();
        let err = fixture
            .manager(
                "config:\n  - name: http\n    base_url: http://a\n  - name: http\n    base_url: http://b\n",
            )
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_connection_settings() {
        let fixture = Fixture::configured();
        let err = fixture.manager("config:\n  - name: http\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_list_actions() {
        let fixture = Fixture::configured();
        let manager = fixture.manager(AGENT_YAML).unwrap();

        let actions = manager.list_actions("http").unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, "fetch-data");

        let actions = manager.list_actions("gemini").unwrap();
        assert_eq!(actions[0].name, "generate-text");

        let err = manager.list_actions("discord").unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownConnection(_)));
    }

    #[tokio::test]
    async fn test_list_connections_reports_configured_state() {
        let fixture = Fixture::new(InMemoryCredentialStore::new());
        let manager = fixture.manager(AGENT_YAML).unwrap();

        let statuses = manager.list_connections().await;
        assert_eq!(
            statuses,
            vec![
                ConnectionStatus {
                    name: "gemini".to_string(),
                    configured: false,
                    is_llm_provider: true,
                },
                ConnectionStatus {
                    name: "http".to_string(),
                    configured: true,
                    is_llm_provider: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_perform_action_routes_by_name() {
        let fixture = Fixture::configured();
        fixture.backend.set_response("Routed!");
        let manager = fixture.manager(AGENT_YAML).unwrap();

        let mut args = Map::new();
        args.insert("endpoint".to_string(), json!("/status"));
        let result = manager.perform_action("http", "fetch-data", args).await.unwrap();
        assert_eq!(result, json!({ "ok": true }));
        assert_eq!(
            fixture.transport.last_request().unwrap().url,
            "https://api.example.com/status"
        );

        let mut args = Map::new();
        args.insert("prompt".to_string(), json!("hi"));
        args.insert("system_instruction".to_string(), json!(""));
        let result = manager
            .perform_action("gemini", "generate-text", args)
            .await
            .unwrap();
        assert_eq!(result, json!("Routed!"));
    }

    #[tokio::test]
    async fn test_perform_action_unknown_connection() {
        let fixture = Fixture::configured();
        let manager = fixture.manager(AGENT_YAML).unwrap();

        let err = manager
            .perform_action("slack", "send-message", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownConnection(ref n) if n == "slack"));
        assert_eq!(fixture.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_provider_requires_configuration() {
        let fixture = Fixture::new(InMemoryCredentialStore::new());
        let manager = fixture.manager(AGENT_YAML).unwrap();
        assert!(manager.llm_provider().await.is_none());

        let prompter = ScriptedPrompter::new(["fresh-key"]);
        assert!(manager.configure_connection("gemini", &prompter).await.unwrap());

        let provider = manager.llm_provider().await.unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(
            fixture.credentials.get("GEMINI_API_KEY").unwrap(),
            Some("fresh-key".to_string())
        );
    }

    #[tokio::test]
    async fn test_configure_unknown_connection() {
        let manager = ConnectionManager::new();
        let err = manager
            .configure_connection("gemini", &ScriptedPrompter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownConnection(_)));
    }

    #[test]
    fn test_default_factory_uses_env_file() {
        let factory = ConnectionFactory::default();
        let connection = factory
            .create("custom", &json!({ "base_url": "http://localhost" }))
            .unwrap();
        assert_eq!(connection.name(), "http");
    }
}
