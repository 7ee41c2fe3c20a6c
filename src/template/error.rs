//! # Synthesis Errors

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid stack configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logical ID {0} is declared twice")]
    DuplicateLogicalId(String),

    #[error("failed to serialize properties of {logical_id}: {source}")]
    Properties {
        logical_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render template as JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("failed to render template as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
