//! # Environment Binding
//!
//! Runtime variables the service container receives at start. Connection
//! details travel as plain values; the password travels only as a secret
//! reference the container runtime resolves with the execution role.

use super::credentials::CredentialObject;
use super::database::DatabaseInstance;
use super::service::{ContainerSecret, KeyValuePair, LoadBalancedService};
use crate::constants::{ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_USER};
use crate::template::Value;
use tracing::debug;

/// Actions the execution role needs to resolve a secret-backed variable
const SECRET_READ_ACTIONS: &[&str] = &[
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
];

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentBinding {
    variables: Vec<KeyValuePair>,
    secrets: Vec<ContainerSecret>,
    secret_arn: Value,
}

impl EnvironmentBinding {
    pub fn new(
        database: &DatabaseInstance,
        credentials: &CredentialObject,
        database_name: &str,
        username: &str,
    ) -> Self {
        let variables = vec![
            KeyValuePair {
                name: ENV_DB_HOST.to_string(),
                value: database.endpoint_address(),
            },
            KeyValuePair {
                name: ENV_DB_NAME.to_string(),
                value: Value::literal(database_name),
            },
            KeyValuePair {
                name: ENV_DB_USER.to_string(),
                value: Value::literal(username),
            },
        ];
        let secrets = vec![ContainerSecret {
            name: ENV_DB_PASSWORD.to_string(),
            value_from: credentials.password_value_from(),
        }];

        Self {
            variables,
            secrets,
            secret_arn: credentials.secret_arn(),
        }
    }

    /// Inject the variables into the service's container and let its
    /// execution role read the secret
    pub fn attach(&self, service: &mut LoadBalancedService) {
        service.container.environment.extend(self.variables.iter().cloned());
        service.container.secrets.extend(self.secrets.iter().cloned());
        service.grant_execution(SECRET_READ_ACTIONS, self.secret_arn.clone());
        debug!(
            container = %service.container.name,
            variables = self.variables.len(),
            secrets = self.secrets.len(),
            "Attached environment binding"
        );
    }
}
