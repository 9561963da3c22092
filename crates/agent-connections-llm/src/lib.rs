//! Generative text connection backed by Gemini

pub mod backend;
mod config;
mod connection;
mod error;
pub mod gemini;
pub mod mock;
mod session;

pub use backend::{ChatSession, ModelBackend, ModelClient};
pub use config::{GenerationConfig, GenerativeTextConfig};
pub use connection::{GenerativeAction, GenerativeTextConnection};
pub use error::GenerativeError;
pub use gemini::GeminiBackend;
pub use session::{ChatTurn, TurnRole, parse_history};
