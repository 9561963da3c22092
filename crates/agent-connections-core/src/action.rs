//! Actions, their typed parameters, and the per-connection action registry

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ConnectionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// JSON-encoded string or an already structured object/array.
    Json,
    Any,
}

impl ParamType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
            ParamType::Json => value.is_string() || value.is_object() || value.is_array(),
            ParamType::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
            ParamType::Json => "json",
            ParamType::Any => "any",
        }
    }

    fn schema(&self) -> Value {
        match self {
            ParamType::Json => json!({ "type": ["string", "object", "array"] }),
            ParamType::Any => json!({}),
            other => json!({ "type": other.as_str() }),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
}

impl ActionParameter {
    pub fn new(
        name: impl Into<String>,
        required: bool,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            required,
            param_type,
            description: description.into(),
        }
    }
}

/// A named capability exposed by a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub parameters: Vec<ActionParameter>,
    pub description: String,
}

impl Action {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            description: description.into(),
        }
    }

    pub fn required(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters
            .push(ActionParameter::new(name, true, param_type, description));
        self
    }

    pub fn optional(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters
            .push(ActionParameter::new(name, false, param_type, description));
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ActionParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Checks `args` against the parameter list. An empty list means valid.
    ///
    /// A `null` value counts as absent. Keys that match no parameter are
    /// ignored here; see [`Action::unknown_arguments`].
    pub fn validate(&self, args: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();

        for param in &self.parameters {
            match args.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        errors.push(format!("missing required parameter `{}`", param.name));
                    }
                }
                Some(value) if !param.param_type.accepts(value) => {
                    errors.push(format!(
                        "parameter `{}` expected {}, got {}",
                        param.name,
                        param.param_type,
                        value_kind(value)
                    ));
                }
                Some(_) => {}
            }
        }

        errors
    }

    pub fn unknown_arguments<'a>(&self, args: &'a Map<String, Value>) -> Vec<&'a str> {
        args.keys()
            .filter(|key| self.parameter(key).is_none())
            .map(|key| key.as_str())
            .collect()
    }

    /// Validation as a `Result`, for use on the dispatch path.
    pub fn check(&self, args: &Map<String, Value>) -> Result<()> {
        let unknown = self.unknown_arguments(args);
        if !unknown.is_empty() {
            tracing::debug!(action = %self.name, ignored = ?unknown, "Ignoring unknown arguments");
        }

        let errors = self.validate(args);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConnectionError::Validation(errors))
        }
    }

    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut schema = param.param_type.schema();
            if let Value::Object(ref mut obj) = schema {
                obj.insert(
                    "description".to_string(),
                    Value::String(param.description.clone()),
                );
            }
            properties.insert(param.name.clone(), schema);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

struct RegisteredAction<K> {
    action: Action,
    kind: K,
}

/// Name-indexed action table. Each action carries the dispatch tag the owning
/// connection matches on, so no lookup by method name happens at call time.
pub struct ActionRegistry<K> {
    entries: Vec<RegisteredAction<K>>,
    index: HashMap<String, usize>,
}

impl<K: Copy> ActionRegistry<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Action, kind: K) -> Result<()> {
        if self.index.contains_key(&action.name) {
            return Err(ConnectionError::config(format!(
                "Action already registered: {}",
                action.name
            )));
        }

        for (i, param) in action.parameters.iter().enumerate() {
            if action.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(ConnectionError::config(format!(
                    "Duplicate parameter `{}` in action {}",
                    param.name, action.name
                )));
            }
        }

        self.index.insert(action.name.clone(), self.entries.len());
        self.entries.push(RegisteredAction { action, kind });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.index.get(name).map(|&i| &self.entries[i].action)
    }

    pub fn lookup(&self, name: &str) -> Result<(&Action, K)> {
        self.index
            .get(name)
            .map(|&i| {
                let entry = &self.entries[i];
                (&entry.action, entry.kind)
            })
            .ok_or_else(|| ConnectionError::UnknownAction(name.to_string()))
    }

    pub fn actions(&self) -> Vec<&Action> {
        self.entries.iter().map(|e| &e.action).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.action.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Copy> Default for ActionRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for ActionRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.action.name, &e.kind)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn fetch_action() -> Action {
        Action::new("fetch-data", "Fetch data from a custom API")
            .required("endpoint", ParamType::String, "API endpoint")
            .optional("method", ParamType::String, "HTTP method")
            .optional("params", ParamType::Json, "Query parameters")
            .optional("body", ParamType::Object, "Request body")
    }

    #[test]
    fn test_valid_arguments() {
        let action = fetch_action();
        let errors = action.validate(&args(json!({
            "endpoint": "/users",
            "method": "POST",
            "body": {"name": "x"}
        })));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_required() {
        let action = fetch_action();
        let errors = action.validate(&args(json!({ "method": "GET" })));
        assert_eq!(errors, vec!["missing required parameter `endpoint`".to_string()]);
    }

    #[test]
    fn test_null_counts_as_absent() {
        let action = fetch_action();
        let errors = action.validate(&args(json!({ "endpoint": null, "body": null })));
        assert_eq!(errors, vec!["missing required parameter `endpoint`".to_string()]);
    }

    #[test]
    fn test_type_mismatch_collects_all() {
        let action = fetch_action();
        let errors = action.validate(&args(json!({
            "endpoint": 42,
            "body": "not an object"
        })));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "parameter `endpoint` expected string, got number");
        assert_eq!(errors[1], "parameter `body` expected object, got string");
    }

    #[test]
    fn test_json_parameter_accepts_string_and_structures() {
        let action = fetch_action();
        for params in [json!("{\"a\":1}"), json!({"a": 1}), json!([1, 2])] {
            let errors = action.validate(&args(json!({ "endpoint": "/", "params": params })));
            assert!(errors.is_empty());
        }

        let errors = action.validate(&args(json!({ "endpoint": "/", "params": true })));
        assert_eq!(errors, vec!["parameter `params` expected json, got boolean".to_string()]);
    }

    #[test]
    fn test_unknown_arguments_are_ignored() {
        let action = fetch_action();
        let supplied = args(json!({ "endpoint": "/", "verbose": true }));
        assert!(action.validate(&supplied).is_empty());
        assert_eq!(action.unknown_arguments(&supplied), vec!["verbose"]);
        assert!(action.check(&supplied).is_ok());
    }

    #[test]
    fn test_check_returns_validation_error() {
        let action = fetch_action();
        let err = action.check(&Map::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_input_schema() {
        let schema = fetch_action().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["endpoint"]));
        assert_eq!(schema["properties"]["method"]["type"], "string");
        assert_eq!(schema["properties"]["endpoint"]["description"], "API endpoint");
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Op {
        Fetch,
        Other,
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ActionRegistry::new();
        registry.register(fetch_action(), Op::Fetch).unwrap();
        registry
            .register(Action::new("other", "Other action"), Op::Other)
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["fetch-data", "other"]);

        let (action, kind) = registry.lookup("fetch-data").unwrap();
        assert_eq!(action.name, "fetch-data");
        assert_eq!(kind, Op::Fetch);

        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownAction(name) if name == "missing"));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ActionRegistry::new();
        registry.register(fetch_action(), Op::Fetch).unwrap();
        assert!(registry.register(fetch_action(), Op::Other).is_err());

        let dup = Action::new("dup", "")
            .required("x", ParamType::String, "")
            .optional("x", ParamType::Integer, "");
        assert!(registry.register(dup, Op::Other).is_err());
        assert!(!registry.contains("dup"));
    }
}
