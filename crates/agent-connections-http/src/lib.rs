//! Generic HTTP API connection

mod config;
mod connection;
mod error;
pub mod mock;
mod transport;

pub use config::HttpConnectionConfig;
pub use connection::{HttpAction, HttpConnection};
pub use error::HttpConnectionError;
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};
