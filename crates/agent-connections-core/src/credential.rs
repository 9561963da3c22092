//! Credential stores injected into connections that need an API key

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConnectionError, Result};

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.write().insert(key.into(), value.into());
        self
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `.env`-file backed store.
///
/// Reads prefer the file so a freshly stored key wins over a stale process
/// variable; the process environment is the fallback. Writes replace an
/// existing `KEY=` line or append one, leaving other lines untouched.
#[derive(Debug, Clone)]
pub struct EnvFileCredentialStore {
    path: PathBuf,
}

impl EnvFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file_value(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let iter = dotenvy::from_path_iter(&self.path).map_err(|e| {
            ConnectionError::Credential(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        for item in iter {
            let (k, v) = match item {
                Ok(pair) => pair,
                Err(dotenvy::Error::LineParse(_, index)) => {
                    tracing::warn!(path = %self.path.display(), index, "Skipping unparsable env line");
                    continue;
                }
                Err(e) => {
                    return Err(ConnectionError::Credential(format!(
                        "failed to parse {}: {}",
                        self.path.display(),
                        e
                    )));
                }
            };
            if k == key {
                return Ok(Some(v));
            }
        }

        Ok(None)
    }
}

impl Default for EnvFileCredentialStore {
    fn default() -> Self {
        Self::new(".env")
    }
}

impl CredentialStore for EnvFileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.read_file_value(key)? {
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }

        Ok(std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let existing = if self.path.exists() {
            fs::read_to_string(&self.path).map_err(|e| {
                ConnectionError::Credential(format!("failed to read {}: {}", self.path.display(), e))
            })?
        } else {
            String::new()
        };

        let entry = format!("{}={}", key, quote_env_value(value));
        let mut replaced = false;
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| {
                if !replaced && line_defines(line, key) {
                    replaced = true;
                    entry.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();

        if !replaced {
            lines.push(entry);
        }

        let mut contents = lines.join("\n");
        contents.push('\n');

        fs::write(&self.path, contents).map_err(|e| {
            ConnectionError::Credential(format!("failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(key, path = %self.path.display(), "Stored credential");
        Ok(())
    }
}

fn line_defines(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(key)
        .map(|rest| rest.trim_start().starts_with('='))
        .unwrap_or(false)
}

fn quote_env_value(value: &str) -> String {
    if value.contains('\'') {
        format!(
            "\"{}\"",
            value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('$', "\\$")
        )
    } else {
        format!("'{}'", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryCredentialStore::new().with("A", "1");
        assert_eq!(store.get("A").unwrap(), Some("1".to_string()));
        assert_eq!(store.get("B").unwrap(), None);

        store.set("B", "2").unwrap();
        assert_eq!(store.get("B").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_env_file_set_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let store = EnvFileCredentialStore::new(&path);

        store.set("AGENT_CONN_TEST_CREATE_KEY", "secret").unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "AGENT_CONN_TEST_CREATE_KEY='secret'\n");
        assert_eq!(
            store.get("AGENT_CONN_TEST_CREATE_KEY").unwrap(),
            Some("secret".to_string())
        );
    }

    #[test]
    fn test_env_file_set_replaces_existing_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# comment\nOTHER=1\nAGENT_CONN_TEST_REPLACE_KEY=old\nLAST=2\n",
        )
        .unwrap();

        let store = EnvFileCredentialStore::new(&path);
        store.set("AGENT_CONN_TEST_REPLACE_KEY", "new").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "# comment\nOTHER=1\nAGENT_CONN_TEST_REPLACE_KEY='new'\nLAST=2\n"
        );
        assert_eq!(
            store.get("AGENT_CONN_TEST_REPLACE_KEY").unwrap(),
            Some("new".to_string())
        );
        assert_eq!(store.get("OTHER").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn test_env_file_quotes_single_quote_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let store = EnvFileCredentialStore::new(&path);

        store.set("AGENT_CONN_TEST_QUOTE_KEY", "it's").unwrap();
        assert_eq!(
            store.get("AGENT_CONN_TEST_QUOTE_KEY").unwrap(),
            Some("it's".to_string())
        );
    }

    #[test]
    fn test_env_file_quoted_value_keeps_dollar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let store = EnvFileCredentialStore::new(&path);

        store.set("AGENT_CONN_TEST_DOLLAR_KEY", "it's $HOME").unwrap();
        assert_eq!(
            store.get("AGENT_CONN_TEST_DOLLAR_KEY").unwrap(),
            Some("it's $HOME".to_string())
        );
    }

    #[test]
    fn test_env_file_skips_unparsable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "SOME OTHER TOOL LINE\nAGENT_CONN_TEST_AFTER_BAD_KEY=abc\n",
        )
        .unwrap();

        let store = EnvFileCredentialStore::new(&path);
        assert_eq!(
            store.get("AGENT_CONN_TEST_AFTER_BAD_KEY").unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_env_file_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = EnvFileCredentialStore::new(dir.path().join("absent.env"));
        assert_eq!(store.get("AGENT_CONN_TEST_SURELY_UNSET_KEY").unwrap(), None);
    }

    #[test]
    fn test_line_defines() {
        assert!(line_defines("KEY=1", "KEY"));
        assert!(line_defines("export KEY = 1", "KEY"));
        assert!(!line_defines("KEY_2=1", "KEY"));
        assert!(!line_defines("# KEY=1", "KEY"));
    }
}
