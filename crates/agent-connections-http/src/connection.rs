use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use agent_connections_core::{
    Action, ActionRegistry, Connection, ConnectionError, ConnectionSetup, ParamType, Prompter,
    Result,
};

use crate::config::HttpConnectionConfig;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpAction {
    FetchData,
}

#[derive(Debug, Deserialize)]
struct FetchDataArgs {
    endpoint: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    headers: Option<Map<String, Value>>,
}

/// Connection to an arbitrary JSON API rooted at a fixed base URL.
pub struct HttpConnection {
    config: HttpConnectionConfig,
    actions: ActionRegistry<HttpAction>,
    transport: Arc<dyn HttpTransport>,
}

impl HttpConnection {
    pub fn new(config: &Value) -> Result<Self> {
        let config = Self::validate_config(config)?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout()));
        Self::from_config(config, transport)
    }

    pub fn with_transport(config: &Value, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Self::from_config(Self::validate_config(config)?, transport)
    }

    pub fn from_config(
        config: HttpConnectionConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            actions: Self::register_actions()?,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &HttpConnectionConfig {
        &self.config
    }

    fn build_request(&self, args: FetchDataArgs) -> Result<HttpRequest> {
        let method_name = args.method.as_deref().unwrap_or("GET").to_uppercase();
        let method = match method_name.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            _ => {
                return Err(ConnectionError::invalid(format!(
                    "Invalid HTTP method: {}",
                    method_name
                )));
            }
        };

        let mut request = HttpRequest::new(method, format!("{}{}", self.config.base_url, args.endpoint));

        if let Some(params) = args.params {
            request.query = query_pairs(params)?;
        }

        if let Some(headers) = args.headers {
            for (key, value) in headers {
                match value {
                    Value::String(s) => request.headers.push((key, s)),
                    Value::Null => {}
                    other => {
                        return Err(ConnectionError::invalid(format!(
                            "header `{}` must be a string, got {}",
                            key, other
                        )));
                    }
                }
            }
        }

        request.body = args.body.filter(|b| !b.is_null());
        Ok(request)
    }

    async fn fetch_data(&self, args: Map<String, Value>) -> Result<Value> {
        let args: FetchDataArgs = serde_json::from_value(Value::Object(args))
            .map_err(|e| ConnectionError::invalid(e.to_string()))?;
        let request = self.build_request(args)?;

        info!(
            method = %request.method,
            url = %request.url,
            headers = ?request.headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            "Sending request"
        );

        Ok(self.transport.send(request).await?)
    }
}

/// Flattens query parameters. A string is decoded as JSON first.
fn query_pairs(params: Value) -> Result<Vec<(String, String)>> {
    let params = match params {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ConnectionError::invalid(format!("Invalid JSON string in 'params': {}", e))
        })?,
        other => other,
    };

    match params {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect()),
        other => Err(ConnectionError::invalid(format!(
            "'params' must be a JSON object, got {}",
            other
        ))),
    }
}

impl ConnectionSetup for HttpConnection {
    type Config = HttpConnectionConfig;
    type ActionKind = HttpAction;

    const NAME: &'static str = "http";

    fn validate_config(config: &Value) -> Result<HttpConnectionConfig> {
        HttpConnectionConfig::from_value(config)
    }

    fn register_actions() -> Result<ActionRegistry<HttpAction>> {
        let mut registry = ActionRegistry::new();
        registry.register(
            Action::new("fetch-data", "Fetch data from a custom API")
                .required("endpoint", ParamType::String, "API endpoint to fetch data from")
                .optional(
                    "method",
                    ParamType::String,
                    "HTTP method (GET, POST, etc.), default is GET",
                )
                .optional(
                    "params",
                    ParamType::Json,
                    "Query parameters, as an object or a JSON-encoded string",
                )
                .optional("body", ParamType::Object, "Request body for POST requests")
                .optional("headers", ParamType::Object, "Custom request headers"),
            HttpAction::FetchData,
        )?;
        Ok(registry)
    }
}

#[async_trait]
impl Connection for HttpConnection {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_llm_provider(&self) -> bool {
        false
    }

    fn actions(&self) -> Vec<&Action> {
        self.actions.actions()
    }

    async fn configure(&self, _prompter: &dyn Prompter) -> bool {
        true
    }

    async fn is_configured(&self, _verbose: bool) -> bool {
        true
    }

    async fn perform_action(&self, action_name: &str, args: Map<String, Value>) -> Result<Value> {
        let (action, kind) = self.actions.lookup(action_name)?;

        if !self.is_configured(true).await {
            return Err(ConnectionError::config(
                "HTTP connection is not properly configured",
            ));
        }

        action.check(&args)?;

        match kind {
            HttpAction::FetchData => self.fetch_data(args).await,
        }
    }
}
