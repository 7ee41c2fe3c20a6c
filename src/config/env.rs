//! # Environment Source
//!
//! A snapshot of key/value configuration taken from the process environment
//! and, optionally, a dotenv file. Construction code never reads the process
//! environment directly; it receives a `StackConfig` built from this snapshot.

use super::error::ConfigError;
use crate::constants::DEFAULT_DOTENV_FILE;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Immutable key/value view used to build a `StackConfig`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Snapshot the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a source from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Layer a dotenv file underneath the current values
    ///
    /// Values already present win, matching dotenv semantics where the real
    /// environment overrides the file.
    pub fn with_dotenv_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        })?;

        let mut loaded = 0usize;
        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::Dotenv {
                path: path.to_path_buf(),
                source,
            })?;
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                loaded += 1;
            }
        }
        debug!(path = %path.display(), loaded, "Loaded dotenv file");
        Ok(self)
    }

    /// Layer `dir/.env` underneath the current values if that file exists
    ///
    /// A directory without a dotenv file leaves the source unchanged.
    pub fn with_local_dotenv(self, dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DEFAULT_DOTENV_FILE);
        if path.is_file() {
            self.with_dotenv_file(&path)
        } else {
            debug!(dir = %dir.display(), "No local dotenv file");
            Ok(self)
        }
    }

    /// Raw lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Required, non-empty value
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        match self.get(key) {
            None => Err(ConfigError::Missing {
                key: key.to_string(),
            }),
            Some(v) if v.trim().is_empty() => Err(ConfigError::Empty {
                key: key.to_string(),
            }),
            Some(v) => Ok(v.to_string()),
        }
    }

    /// Optional string with default; blank counts as unset
    pub fn string_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => default.to_string(),
        }
    }

    /// Optional parsed value with default
    ///
    /// Unlike a silent fallback, an unparsable value is an error: a typo in
    /// `MAX_AZS` must not quietly synthesize a different network.
    pub fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => v
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(key, v, e.to_string())),
            _ => Ok(default),
        }
    }

    /// Optional boolean with default (true/1/yes/on, false/0/no/off)
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => parse_bool(v)
                .ok_or_else(|| ConfigError::invalid(key, v, "expected true/false")),
            _ => Ok(default),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
