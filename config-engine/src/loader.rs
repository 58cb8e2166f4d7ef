use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Builder over the `config` crate that layers defaults, a file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    files: Vec<(PathBuf, bool)>,
    list_keys: Vec<String>,
    load_dotenv: bool,
}

impl ConfigLoader {
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
            files: Vec::new(),
            list_keys: Vec::new(),
            load_dotenv: true,
        }
    }

    /// Add a file that must exist
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Add a file that is skipped when absent
    #[must_use]
    pub fn optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Treat an environment value for `key` as a comma-separated list
    #[must_use]
    pub fn list_key(mut self, key: impl Into<String>) -> Self {
        self.list_keys.push(key.into());
        self
    }

    #[must_use]
    pub fn dotenv(mut self, enabled: bool) -> Self {
        self.load_dotenv = enabled;
        self
    }

    /// Build the layered configuration and deserialize it into `T`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceNotFound`] for a missing required file and
    /// [`ConfigError::ParseError`] when a source cannot be read or the merged
    /// values do not fit `T`.
    pub fn load<T>(self) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        if self.load_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(ConfigError::ParseError(e.to_string())),
            }
        }

        let defaults = serde_json::to_value(T::default())
            .map_err(|e| ConfigError::DefaultsError(e.to_string()))?;

        let mut builder = Config::builder();
        let mut flattened = Vec::new();
        flatten_defaults(None, &defaults, &mut flattened);
        for (key, value) in flattened {
            builder = builder.set_default(key, value)?;
        }

        for (path, required) in &self.files {
            if *required && !path.exists() {
                return Err(ConfigError::SourceNotFound(path.display().to_string()));
            }
            debug!(path = %path.display(), required, "Adding configuration file");
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }

        let mut environment = Environment::with_prefix(&self.env_prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);
        if !self.list_keys.is_empty() {
            environment = environment.list_separator(",");
            for key in &self.list_keys {
                environment = environment.with_list_parse_key(key);
            }
        }
        builder = builder.add_source(environment);

        let config = builder.build()?;
        config
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Flatten a JSON tree into dotted `config` keys; `null` leaves no default
fn flatten_defaults(
    prefix: Option<&str>,
    value: &serde_json::Value,
    out: &mut Vec<(String, config::Value)>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (name, child) in map {
                let key = match prefix {
                    Some(p) => format!("{p}.{name}"),
                    None => name.clone(),
                };
                flatten_defaults(Some(&key), child, out);
            }
        }
        other => {
            if let (Some(key), Some(converted)) = (prefix, to_config_value(other)) {
                out.push((key.to_string(), converted));
            }
        }
    }
}

fn to_config_value(value: &serde_json::Value) -> Option<config::Value> {
    match value {
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
        serde_json::Value::Bool(b) => Some(config::Value::from(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(config::Value::from(i))
            } else {
                n.as_f64().map(config::Value::from)
            }
        }
        serde_json::Value::String(s) => Some(config::Value::from(s.clone())),
        serde_json::Value::Array(items) => {
            let converted: Vec<config::Value> = items.iter().filter_map(to_config_value).collect();
            Some(config::Value::from(converted))
        }
    }
}
