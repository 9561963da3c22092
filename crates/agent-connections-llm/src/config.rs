use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_connections_core::{ConnectionError, Result, parse_config};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerativeTextConfig {
    /// Model identifier, e.g. `gemini-2.0-flash`
    pub model: String,

    /// Credential key holding the API key (default: GEMINI_API_KEY)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    8192
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl GenerativeTextConfig {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        Self {
            model: model.into(),
            api_key_env: default_api_key_env(),
            generation: GenerationConfig::default(),
        }
        .check()
    }

    pub fn from_value(config: &Value) -> Result<Self> {
        parse_config::<Self>("gemini", config)?.check()
    }

    fn check(self) -> Result<Self> {
        if self.model.trim().is_empty() {
            return Err(ConnectionError::config("model must be a non-empty string"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(ConnectionError::config(
                "api_key_env must be a non-empty string",
            ));
        }
        Ok(self)
    }
}
