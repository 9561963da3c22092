use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameters: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{connection} API error: {message}")]
    Api { connection: String, message: String },

    #[error("Credential store error: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

impl ConnectionError {
    pub fn api(connection: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectionError::Api {
            connection: connection.into(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ConnectionError::Validation(vec![message.into()])
    }

    pub fn config(message: impl Into<String>) -> Self {
        ConnectionError::Configuration(message.into())
    }

    pub fn is_api(&self) -> bool {
        matches!(self, ConnectionError::Api { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ConnectionError::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ConnectionError::Configuration(_))
    }
}
