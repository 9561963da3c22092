use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerativeError {
    #[error("Failed to build model client: {0}")]
    Client(String),

    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Failed to list models: {0}")]
    ListModels(String),
}
