//! # Topology
//!
//! Declaration of the Bookstore deployment in one linear pass:
//!
//! 1. Network segment (`BookStoreVpc`)
//! 2. Compute cluster (`BookStoreCluster`)
//! 3. Load-balanced service (`BookStoreFargate`)
//! 4. Database access policy (`DatabaseSecurityGroup`)
//! 5. Credential object (`DBCredentialsSecret`)
//! 6. Database instance (`BookstoreDatabase`)
//! 7. Environment binding, attached to the service's container
//!
//! Each step consumes the identifiers of earlier steps. Nothing here reads the
//! process environment or performs I/O; the configuration arrives validated
//! and the result is a [`Template`].

pub mod access;
pub mod cluster;
pub mod common;
pub mod credentials;
pub mod database;
pub mod environment;
pub mod network;
pub mod service;

use crate::config::StackConfig;
use crate::constants::CONTAINER_IMAGE;
use crate::template::{Output, Scope, SynthError, Template, Value};
use access::DatabaseAccessPolicy;
use cluster::ComputeCluster;
use credentials::CredentialObject;
use database::DatabaseInstance;
use environment::EnvironmentBinding;
use network::NetworkSegment;
use service::LoadBalancedService;
use tracing::{debug, info};

/// A component that contributes resources to a template
pub trait Declaration {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError>;
}

/// Every component of one stack, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub config: StackConfig,
    pub network: NetworkSegment,
    pub cluster: ComputeCluster,
    pub service: LoadBalancedService,
    pub access_policy: DatabaseAccessPolicy,
    pub credentials: CredentialObject,
    pub database: DatabaseInstance,
    pub environment: EnvironmentBinding,
}

impl Topology {
    /// Validate `config` and declare every component
    ///
    /// Fails before any resource is declared if the configuration is invalid.
    pub fn declare(config: &StackConfig) -> Result<Self, SynthError> {
        config.validate()?;
        info!(
            stack = %config.stack_name,
            database = %config.database_name,
            "Declaring stack topology"
        );

        let root = Scope::root(config.stack_name.clone());

        let network = NetworkSegment::new(&root.child("BookStoreVpc"), &config.network);
        let cluster = ComputeCluster::new(&root.child("BookStoreCluster"), &network);
        let mut service = LoadBalancedService::new(
            &root.child("BookStoreFargate"),
            &cluster,
            &network,
            CONTAINER_IMAGE,
        );
        let access_policy =
            DatabaseAccessPolicy::new(&root.child("DatabaseSecurityGroup"), &network, &service);
        let mut credentials = CredentialObject::new(&root.child("DBCredentialsSecret"), config);
        let database = DatabaseInstance::new(
            &root.child("BookstoreDatabase"),
            config,
            &network,
            &access_policy,
            &credentials,
        );

        credentials.attach_to(&database.instance);
        let environment = EnvironmentBinding::new(
            &database,
            &credentials,
            &config.database_name,
            &config.database_username,
        );
        environment.attach(&mut service);

        debug!(stack = %config.stack_name, "Topology declared");

        Ok(Self {
            config: config.clone(),
            network,
            cluster,
            service,
            access_policy,
            credentials,
            database,
            environment,
        })
    }

    /// Render every component into a template
    pub fn synthesize(&self) -> Result<Template, SynthError> {
        let mut template = Template::new(&self.config.stack_name);

        let components: [&dyn Declaration; 6] = [
            &self.network,
            &self.cluster,
            &self.service,
            &self.access_policy,
            &self.credentials,
            &self.database,
        ];
        for component in components {
            component.emit(&mut template)?;
        }

        if self.config.emit_outputs {
            self.add_outputs(&mut template);
        }

        info!(
            stack = %self.config.stack_name,
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            "Synthesized template"
        );
        Ok(template)
    }

    fn add_outputs(&self, template: &mut Template) {
        template.add_output(
            "DatabaseEndpoint",
            Output {
                description: "Database endpoint address".to_string(),
                value: self.database.endpoint_address(),
            },
        );
        template.add_output(
            "DatabaseName",
            Output {
                description: "Database name".to_string(),
                value: Value::literal(self.config.database_name.clone()),
            },
        );
        template.add_output(
            "DatabaseUsername",
            Output {
                description: "Database master username".to_string(),
                value: Value::literal(self.config.database_username.clone()),
            },
        );
        template.add_output(
            "LoadBalancerDNS",
            Output {
                description: "Public DNS name of the load balancer".to_string(),
                value: self.service.load_balancer_dns(),
            },
        );
    }
}

/// Declare and render a stack in one step
pub fn synthesize(config: &StackConfig) -> Result<Template, SynthError> {
    Topology::declare(config)?.synthesize()
}
