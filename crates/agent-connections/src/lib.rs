//! Agent Connections
//!
//! Uniform action interface over external services for AI agents.

mod manager;

pub use manager::{AgentConfig, ConnectionEntry, ConnectionFactory, ConnectionManager, ConnectionStatus};

pub mod action {
    pub use agent_connections_core::{Action, ActionParameter, ActionRegistry, ParamType};
}

pub mod connection {
    pub use agent_connections_core::{
        Connection, ConnectionInfo, ConnectionSetup, config_schema, parse_config,
    };
}

pub mod credential {
    pub use agent_connections_core::{
        CredentialStore, EnvFileCredentialStore, InMemoryCredentialStore,
    };
}

pub mod error {
    pub use agent_connections_core::{ConnectionError, Result};
}

pub mod prompt {
    pub use agent_connections_core::{Prompter, ScriptedPrompter, StdioPrompter};
}

pub mod http {
    pub use agent_connections_http::mock::MockTransport;
    pub use agent_connections_http::{
        HttpAction, HttpConnection, HttpConnectionConfig, HttpConnectionError, HttpRequest,
        HttpTransport, ReqwestTransport,
    };
}

pub mod generative {
    pub use agent_connections_llm::mock::MockModelBackend;
    pub use agent_connections_llm::{
        ChatSession, ChatTurn, GeminiBackend, GenerationConfig, GenerativeAction,
        GenerativeError, GenerativeTextConfig, GenerativeTextConnection, ModelBackend,
        ModelClient, TurnRole, parse_history,
    };
}

pub use agent_connections_core::{Connection, ConnectionError, Result};
