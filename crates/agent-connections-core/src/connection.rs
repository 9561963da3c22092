//! Connection trait shared by every external-service adapter

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::{Action, ActionRegistry};
use crate::error::{ConnectionError, Result};
use crate::prompt::Prompter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub name: String,
    pub is_llm_provider: bool,
    pub actions: Vec<Action>,
}

/// Uniform action interface over one external system.
#[async_trait]
pub trait Connection: Send + Sync {
    fn name(&self) -> &str;

    /// Text-generation connections answer `true`; orchestrators pick these for
    /// conversational work.
    fn is_llm_provider(&self) -> bool;

    fn actions(&self) -> Vec<&Action>;

    /// One-time interactive setup. May persist a credential.
    async fn configure(&self, prompter: &dyn Prompter) -> bool;

    /// Never fails: any underlying error is reported as `false`.
    async fn is_configured(&self, verbose: bool) -> bool;

    async fn perform_action(&self, action_name: &str, args: Map<String, Value>) -> Result<Value>;

    fn action(&self, name: &str) -> Option<&Action> {
        self.actions().into_iter().find(|a| a.name == name)
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            name: self.name().to_string(),
            is_llm_provider: self.is_llm_provider(),
            actions: self.actions().into_iter().cloned().collect(),
        }
    }
}

/// Construction-time half of a connection: config validation and the static
/// action table.
pub trait ConnectionSetup: Connection + Sized {
    type Config;
    type ActionKind: Copy + Send + Sync + 'static;

    const NAME: &'static str;

    fn validate_config(config: &Value) -> Result<Self::Config>;

    fn register_actions() -> Result<ActionRegistry<Self::ActionKind>>;
}

/// Deserializes a loosely typed configuration mapping into `T`.
pub fn parse_config<T: DeserializeOwned>(connection: &str, config: &Value) -> Result<T> {
    T::deserialize(config).map_err(|e| {
        ConnectionError::Configuration(format!("invalid {} configuration: {}", connection, e))
    })
}

pub fn config_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}))
}
