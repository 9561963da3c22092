//! Conversation turns and history decoding

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use agent_connections_core::{ConnectionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    #[serde(deserialize_with = "deserialize_parts")]
    pub parts: Vec<String>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![text.into()],
        }
    }

    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PartRepr {
    Text(String),
    Inline { text: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PartsRepr {
    Many(Vec<PartRepr>),
    One(PartRepr),
}

impl From<PartRepr> for String {
    fn from(part: PartRepr) -> Self {
        match part {
            PartRepr::Text(text) | PartRepr::Inline { text } => text,
        }
    }
}

// Accepts `"hi"`, `["hi"]` and `[{"text": "hi"}]`.
fn deserialize_parts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PartsRepr::deserialize(deserializer)? {
        PartsRepr::Many(parts) => parts.into_iter().map(String::from).collect(),
        PartsRepr::One(part) => vec![part.into()],
    })
}

/// Decodes a conversation history given either as a JSON-encoded string or as
/// an already structured array. `null` is an empty history.
pub fn parse_history(history: Value) -> Result<Vec<ChatTurn>> {
    let history = match history {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ConnectionError::invalid(format!("Invalid JSON string in 'history': {}", e))
        })?,
        other => other,
    };

    match history {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(history)
            .map_err(|e| ConnectionError::invalid(format!("Invalid 'history' entry: {}", e))),
        other => Err(ConnectionError::invalid(format!(
            "'history' must be a JSON array, got {}",
            other
        ))),
    }
}
