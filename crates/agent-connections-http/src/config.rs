use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use agent_connections_core::{ConnectionError, Result, parse_config};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HttpConnectionConfig {
    /// Base URL every endpoint is appended to
    pub base_url: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpConnectionConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
        .normalize()
    }

    pub fn from_value(config: &Value) -> Result<Self> {
        parse_config::<Self>("http", config)?.normalize()
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Result<Self> {
        self.timeout_secs = timeout_secs;
        self.normalize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn normalize(mut self) -> Result<Self> {
        let trimmed = self.base_url.trim_end_matches('/');
        if trimmed.trim().is_empty() {
            return Err(ConnectionError::config(
                "Configuration must include a valid 'base_url' string.",
            ));
        }
        self.base_url = trimmed.to_string();

        if self.timeout_secs == 0 {
            return Err(ConnectionError::config(
                "'timeout_secs' must be greater than zero",
            ));
        }

        Ok(self)
    }
}
