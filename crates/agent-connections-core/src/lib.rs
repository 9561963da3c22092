//! Core types and traits for agent connections

pub mod action;
pub mod connection;
pub mod credential;
pub mod error;
pub mod prompt;

pub use action::{Action, ActionParameter, ActionRegistry, ParamType};
pub use connection::{Connection, ConnectionInfo, ConnectionSetup, config_schema, parse_config};
pub use credential::{CredentialStore, EnvFileCredentialStore, InMemoryCredentialStore};
pub use error::{ConnectionError, Result};
pub use prompt::{Prompter, ScriptedPrompter, StdioPrompter};
