//! # CloudFormation Template
//!
//! The deployment unit produced by a synthesis: resources keyed by logical
//! ID, optional outputs, and generator metadata.
//!
//! - `intrinsic.rs` - `Ref` / `Fn::*` property values
//! - `logical_id.rs` - Path-derived logical IDs and declaration scopes
//! - `error.rs` - `SynthError`

pub mod error;
pub mod intrinsic;
pub mod logical_id;

pub use error::SynthError;
pub use intrinsic::Value;
pub use logical_id::{LogicalId, Scope};

use crate::constants::TEMPLATE_FORMAT_VERSION;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// The `Name` tag console views display
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            key: "Name".to_string(),
            value: value.into(),
        }
    }
}

/// One entry of the `Resources` section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,
    pub properties: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl Resource {
    pub fn new(
        logical_id: &LogicalId,
        kind: &str,
        properties: &impl Serialize,
    ) -> Result<Self, SynthError> {
        let properties =
            serde_json::to_value(properties).map_err(|source| SynthError::Properties {
                logical_id: logical_id.to_string(),
                source,
            })?;
        Ok(Self {
            kind: kind.to_string(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        })
    }

    #[must_use]
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = LogicalId>) -> Self {
        self.depends_on.extend(ids);
        self
    }

    /// Apply the same policy on stack deletion and on replacement
    #[must_use]
    pub fn removal_policy(mut self, policy: &str) -> Self {
        self.deletion_policy = Some(policy.to_string());
        self.update_replace_policy = Some(policy.to_string());
        self
    }

    /// Property lookup by CloudFormation name
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }
}

/// One entry of the `Outputs` section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneratorMetadata {
    pub generator: String,
    pub generator_build: String,
    pub stack_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    pub metadata: BTreeMap<String, GeneratorMetadata>,
    pub resources: BTreeMap<LogicalId, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(stack_name: &str) -> Self {
        let metadata = GeneratorMetadata {
            generator: format!("bookstore-synth {}", env!("CARGO_PKG_VERSION")),
            generator_build: env!("BUILD_GIT_HASH").to_string(),
            stack_name: stack_name.to_string(),
        };
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: format!(
                "{stack_name}: VPC, load-balanced Fargate service and MySQL database with generated credentials"
            ),
            metadata: BTreeMap::from([("Bookstore::Synth".to_string(), metadata)]),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Add a resource, rejecting duplicate logical IDs
    pub fn add(&mut self, logical_id: LogicalId, resource: Resource) -> Result<(), SynthError> {
        if self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId(logical_id.to_string()));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) {
        self.outputs.insert(name.into(), output);
    }

    pub fn resource(&self, logical_id: &LogicalId) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Resources of one CloudFormation type, in logical ID order
    pub fn resources_of_type<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources.iter().filter(move |(_, r)| r.kind == kind)
    }

    pub fn count_of_type(&self, kind: &str) -> usize {
        self.resources_of_type(kind).count()
    }

    pub fn to_json(&self) -> Result<String, SynthError> {
        serde_json::to_string_pretty(self).map_err(SynthError::Json)
    }

    pub fn to_yaml(&self) -> Result<String, SynthError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, SynthError> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Yaml => self.to_yaml(),
        }
    }
}

/// Hex SHA-256 of a rendered document
pub fn digest(rendered: &str) -> String {
    format!("{:x}", Sha256::digest(rendered.as_bytes()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format '{other}' (expected json or yaml)")),
        }
    }
}
