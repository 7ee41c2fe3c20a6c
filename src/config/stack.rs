//! # Stack Configuration
//!
//! The explicit input record of the topology builder.
//!
//! A `StackConfig` can be loaded from an [`EnvSource`] (process environment
//! plus optional dotenv file) or from a YAML/JSON file, and is always
//! validated before any resource is declared.
//!
//! # Example
//!
//! ```yaml
//! stackName: BookstoreStack
//! databaseName: shop
//! databaseUsername: admin
//! network:
//!   maxAzs: 2
//!   subnetCidrMask: 24
//! teardown:
//!   removalPolicy: destroy
//!   deletionProtection: false
//! emitOutputs: false
//! ```

use super::env::EnvSource;
use super::error::ConfigError;
use super::validation;
use crate::constants::{DEFAULT_MAX_AZS, DEFAULT_STACK_NAME, DEFAULT_SUBNET_CIDR_MASK};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Environment keys understood by [`StackConfig::from_env`]
pub mod keys {
    pub const STACK_NAME: &str = "STACK_NAME";
    pub const DB_NAME: &str = "DB_NAME";
    pub const DB_USER: &str = "DB_USER";
    pub const MAX_AZS: &str = "MAX_AZS";
    pub const SUBNET_CIDR_MASK: &str = "SUBNET_CIDR_MASK";
    pub const DB_REMOVAL_POLICY: &str = "DB_REMOVAL_POLICY";
    pub const DB_DELETION_PROTECTION: &str = "DB_DELETION_PROTECTION";
    pub const EMIT_OUTPUTS: &str = "EMIT_OUTPUTS";
}

/// Input record for a single stack synthesis
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StackConfig {
    /// Name of the deployment unit
    #[serde(default = "default_stack_name")]
    pub stack_name: String,
    /// Name of the database created inside the instance (also prefixes the credentials secret)
    pub database_name: String,
    /// Master username stored in the generated credentials secret
    pub database_username: String,
    /// Network segment sizing
    #[serde(default)]
    pub network: NetworkSettings,
    /// What happens to the database when the stack is torn down
    #[serde(default)]
    pub teardown: TeardownPolicy,
    /// Emit stack outputs (endpoint, database name, username, load balancer DNS)
    #[serde(default)]
    pub emit_outputs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkSettings {
    /// Availability zones to spread subnets across
    #[serde(default = "default_max_azs")]
    pub max_azs: u8,
    /// Prefix length of every public and private subnet
    #[serde(default = "default_subnet_cidr_mask")]
    pub subnet_cidr_mask: u8,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            max_azs: DEFAULT_MAX_AZS,
            subnet_cidr_mask: DEFAULT_SUBNET_CIDR_MASK,
        }
    }
}

/// Database teardown behavior
///
/// Defaults to destroy with deletion protection off, which keeps development
/// stacks disposable. Production-like stacks should choose `retain` or
/// `snapshot` and enable deletion protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeardownPolicy {
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
    #[serde(default)]
    pub deletion_protection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the instance with the stack
    #[default]
    Destroy,
    /// Orphan the instance
    Retain,
    /// Take a final snapshot, then delete
    Snapshot,
}

impl RemovalPolicy {
    /// Value of the CloudFormation `DeletionPolicy` / `UpdateReplacePolicy` attribute
    #[must_use]
    pub fn as_cfn_policy(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemovalPolicy::Destroy => "destroy",
            RemovalPolicy::Retain => "retain",
            RemovalPolicy::Snapshot => "snapshot",
        };
        f.write_str(s)
    }
}

impl FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "destroy" | "delete" => Ok(RemovalPolicy::Destroy),
            "retain" => Ok(RemovalPolicy::Retain),
            "snapshot" => Ok(RemovalPolicy::Snapshot),
            other => Err(format!(
                "unknown removal policy '{other}' (expected destroy, retain or snapshot)"
            )),
        }
    }
}

fn default_stack_name() -> String {
    DEFAULT_STACK_NAME.to_string()
}

fn default_max_azs() -> u8 {
    DEFAULT_MAX_AZS
}

fn default_subnet_cidr_mask() -> u8 {
    DEFAULT_SUBNET_CIDR_MASK
}

impl StackConfig {
    /// Config with the required values and every default
    pub fn new(database_name: impl Into<String>, database_username: impl Into<String>) -> Self {
        Self {
            stack_name: default_stack_name(),
            database_name: database_name.into(),
            database_username: database_username.into(),
            network: NetworkSettings::default(),
            teardown: TeardownPolicy::default(),
            emit_outputs: false,
        }
    }

    /// Load and validate configuration from an environment snapshot
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let config = Self {
            stack_name: env.string_or(keys::STACK_NAME, DEFAULT_STACK_NAME),
            database_name: env.require(keys::DB_NAME)?,
            database_username: env.require(keys::DB_USER)?,
            network: NetworkSettings {
                max_azs: env.parsed_or(keys::MAX_AZS, DEFAULT_MAX_AZS)?,
                subnet_cidr_mask: env
                    .parsed_or(keys::SUBNET_CIDR_MASK, DEFAULT_SUBNET_CIDR_MASK)?,
            },
            teardown: TeardownPolicy {
                removal_policy: env
                    .parsed_or(keys::DB_REMOVAL_POLICY, RemovalPolicy::default())?,
                deletion_protection: env.bool_or(keys::DB_DELETION_PROTECTION, false)?,
            },
            emit_outputs: env.bool_or(keys::EMIT_OUTPUTS, false)?,
        };
        config.validate()?;
        debug!(stack = %config.stack_name, "Loaded stack configuration from environment");
        Ok(config)
    }

    /// Load and validate configuration from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // YAML is a superset of JSON, one parser covers both
        let config: Self =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), stack = %config.stack_name, "Loaded stack configuration from file");
        Ok(config)
    }

    /// Check every field, failing on the first invalid one
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_stack_config(self)
    }

    /// Name of the generated credentials secret
    #[must_use]
    pub fn credentials_secret_name(&self) -> String {
        format!(
            "{}{}",
            self.database_name,
            crate::constants::CREDENTIALS_SECRET_SUFFIX
        )
    }
}
