use thiserror::Error;

use agent_connections_core::ConnectionError;

#[derive(Debug, Error)]
pub enum HttpConnectionError {
    #[error("HTTP error: {status} {reason} for url {url}")]
    Status {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("API request failed: {0}")]
    Request(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),
}

impl HttpConnectionError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpConnectionError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpConnectionError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            HttpConnectionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            HttpConnectionError::Request(err.to_string())
        }
    }
}

impl From<HttpConnectionError> for ConnectionError {
    fn from(err: HttpConnectionError) -> Self {
        ConnectionError::api("http", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = HttpConnectionError::Status {
            status: 404,
            reason: "Not Found".to_string(),
            url: "http://x/missing".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 404 Not Found for url http://x/missing");
    }

    #[test]
    fn test_converts_to_api_error() {
        let err: ConnectionError = HttpConnectionError::Timeout("deadline".to_string()).into();
        match err {
            ConnectionError::Api {
                connection,
                message,
            } => {
                assert_eq!(connection, "http");
                assert_eq!(message, "Timeout error: deadline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
