//! # Database Instance
//!
//! Single-AZ MySQL instance in the private subnets. Sizing, engine and
//! protection settings are fixed; only the teardown behavior comes from
//! configuration.
//!
//! Master credentials are dynamic references into the credential object and
//! are never rendered as literals.

use super::access::DatabaseAccessPolicy;
use super::common::{kinds, PolicyDocument, RoleProps};
use super::credentials::CredentialObject;
use super::network::NetworkSegment;
use super::Declaration;
use crate::config::{StackConfig, TeardownPolicy};
use crate::constants::{
    DB_ALLOCATED_STORAGE_GIB, DB_BACKUP_RETENTION_DAYS, DB_ENGINE, DB_ENGINE_VERSION,
    DB_INSTANCE_CLASS, DB_MAX_ALLOCATED_STORAGE_GIB, DB_MONITORING_INTERVAL_SECS, DB_PORT,
};
use crate::template::intrinsic::pseudo;
use crate::template::{LogicalId, Resource, Scope, SynthError, Template, Value};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseInstance {
    pub instance: LogicalId,
    pub subnet_group: LogicalId,
    pub monitoring_role: LogicalId,
    pub database_name: String,
    pub teardown: TeardownPolicy,
    subnets: Vec<Value>,
    security_group: Value,
    master_username: Value,
    master_password: Value,
    name_tag: String,
}

impl DatabaseInstance {
    pub fn new(
        scope: &Scope,
        config: &StackConfig,
        network: &NetworkSegment,
        access: &DatabaseAccessPolicy,
        credentials: &CredentialObject,
    ) -> Self {
        debug!(
            database = %config.database_name,
            removal_policy = %config.teardown.removal_policy,
            deletion_protection = config.teardown.deletion_protection,
            "Declared database instance"
        );

        Self {
            instance: scope.logical_id(),
            subnet_group: scope.id("SubnetGroup"),
            monitoring_role: scope.id("MonitoringRole"),
            database_name: config.database_name.clone(),
            teardown: config.teardown,
            subnets: network.private_subnet_refs(),
            security_group: access.group_id(),
            master_username: credentials.resolve_username(),
            master_password: credentials.resolve_password(),
            name_tag: scope.path(),
        }
    }

    /// Hostname clients connect to
    pub fn endpoint_address(&self) -> Value {
        Value::get_att(&self.instance, "Endpoint.Address")
    }
}

impl Declaration for DatabaseInstance {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.subnet_group.clone(),
            Resource::new(
                &self.subnet_group,
                kinds::DB_SUBNET_GROUP,
                &SubnetGroupProps {
                    db_subnet_group_description: format!(
                        "Subnet group for {}",
                        self.name_tag
                    ),
                    subnet_ids: self.subnets.clone(),
                },
            )?
            .removal_policy("Delete"),
        )?;

        template.add(
            self.monitoring_role.clone(),
            Resource::new(
                &self.monitoring_role,
                kinds::IAM_ROLE,
                &RoleProps {
                    assume_role_policy_document: PolicyDocument::assumed_by(
                        "monitoring.rds.amazonaws.com",
                    ),
                    managed_policy_arns: vec![Value::concat(vec![
                        Value::literal("arn:"),
                        Value::pseudo(pseudo::PARTITION),
                        Value::literal(":iam::aws:policy/service-role/AmazonRDSEnhancedMonitoringRole"),
                    ])],
                },
            )?,
        )?;

        let policy = self.teardown.removal_policy.as_cfn_policy();
        template.add(
            self.instance.clone(),
            Resource::new(
                &self.instance,
                kinds::DB_INSTANCE,
                &InstanceProps {
                    engine: DB_ENGINE,
                    engine_version: DB_ENGINE_VERSION,
                    db_instance_class: DB_INSTANCE_CLASS,
                    db_name: self.database_name.clone(),
                    allocated_storage: DB_ALLOCATED_STORAGE_GIB.to_string(),
                    max_allocated_storage: DB_MAX_ALLOCATED_STORAGE_GIB,
                    storage_type: "gp2",
                    storage_encrypted: true,
                    publicly_accessible: false,
                    multi_az: false,
                    port: DB_PORT.to_string(),
                    auto_minor_version_upgrade: true,
                    allow_major_version_upgrade: false,
                    backup_retention_period: DB_BACKUP_RETENTION_DAYS,
                    copy_tags_to_snapshot: true,
                    deletion_protection: self.teardown.deletion_protection,
                    enable_performance_insights: false,
                    monitoring_interval: DB_MONITORING_INTERVAL_SECS,
                    monitoring_role_arn: Value::get_att(&self.monitoring_role, "Arn"),
                    db_subnet_group_name: Value::reference(&self.subnet_group),
                    vpc_security_groups: vec![self.security_group.clone()],
                    master_username: self.master_username.clone(),
                    master_user_password: self.master_password.clone(),
                },
            )?
            .removal_policy(policy),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetGroupProps {
    #[serde(rename = "DBSubnetGroupDescription")]
    db_subnet_group_description: String,
    subnet_ids: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceProps {
    engine: &'static str,
    engine_version: &'static str,
    #[serde(rename = "DBInstanceClass")]
    db_instance_class: &'static str,
    #[serde(rename = "DBName")]
    db_name: String,
    allocated_storage: String,
    max_allocated_storage: u32,
    storage_type: &'static str,
    storage_encrypted: bool,
    publicly_accessible: bool,
    #[serde(rename = "MultiAZ")]
    multi_az: bool,
    port: String,
    auto_minor_version_upgrade: bool,
    allow_major_version_upgrade: bool,
    backup_retention_period: u32,
    copy_tags_to_snapshot: bool,
    deletion_protection: bool,
    enable_performance_insights: bool,
    monitoring_interval: u32,
    monitoring_role_arn: Value,
    #[serde(rename = "DBSubnetGroupName")]
    db_subnet_group_name: Value,
    #[serde(rename = "VPCSecurityGroups")]
    vpc_security_groups: Vec<Value>,
    master_username: Value,
    master_user_password: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkSettings, RemovalPolicy};
    use crate::constants::CONTAINER_IMAGE;
    use crate::topology::cluster::ComputeCluster;
    use crate::topology::service::LoadBalancedService;

    fn declared(config: &StackConfig) -> (DatabaseInstance, Template) {
        let root = Scope::root("Test");
        let network = NetworkSegment::new(&root.child("BookStoreVpc"), &NetworkSettings::default());
        let cluster = ComputeCluster::new(&root.child("BookStoreCluster"), &network);
        let service = LoadBalancedService::new(
            &root.child("BookStoreFargate"),
            &cluster,
            &network,
            CONTAINER_IMAGE,
        );
        let access =
            DatabaseAccessPolicy::new(&root.child("DatabaseSecurityGroup"), &network, &service);
        let credentials = CredentialObject::new(&root.child("DBCredentialsSecret"), config);
        let database = DatabaseInstance::new(
            &root.child("BookstoreDatabase"),
            config,
            &network,
            &access,
            &credentials,
        );

        let mut template = Template::new("Test");
        database.emit(&mut template).unwrap();
        (database, template)
    }

    #[test]
    fn test_fixed_instance_policy() {
        let (database, template) = declared(&StackConfig::new("shop", "admin"));
        let instance = template.resource(&database.instance).unwrap();

        assert_eq!(instance.property("Engine").unwrap(), "mysql");
        assert_eq!(instance.property("EngineVersion").unwrap(), "8.0");
        assert_eq!(instance.property("DBInstanceClass").unwrap(), "db.t2.micro");
        assert_eq!(instance.property("DBName").unwrap(), "shop");
        assert_eq!(instance.property("AllocatedStorage").unwrap(), "20");
        assert_eq!(instance.property("MaxAllocatedStorage").unwrap(), 30);
        assert_eq!(instance.property("StorageEncrypted").unwrap(), true);
        assert_eq!(instance.property("PubliclyAccessible").unwrap(), false);
        assert_eq!(instance.property("MultiAZ").unwrap(), false);
        assert_eq!(instance.property("BackupRetentionPeriod").unwrap(), 7);
        assert_eq!(instance.property("MonitoringInterval").unwrap(), 60);
        assert_eq!(instance.property("EnablePerformanceInsights").unwrap(), false);
    }

    #[test]
    fn test_placed_in_private_subnets() {
        let (database, template) = declared(&StackConfig::new("shop", "admin"));
        let group = template.resource(&database.subnet_group).unwrap();
        let ids = group.property("SubnetIds").unwrap().as_array().unwrap();

        assert_eq!(ids.len(), 2);
        for id in ids {
            let name = id["Ref"].as_str().unwrap();
            assert!(name.starts_with("BookStoreVpcPrivateSubnet"), "{name} is not private");
        }
    }

    #[test]
    fn test_credentials_are_dynamic_references() {
        let (database, template) = declared(&StackConfig::new("shop", "admin"));
        let instance = template.resource(&database.instance).unwrap();

        let password = instance.property("MasterUserPassword").unwrap().to_string();
        assert!(password.contains("{{resolve:secretsmanager:"));
        assert!(password.contains(":SecretString:password::}}"));
        let username = instance.property("MasterUsername").unwrap().to_string();
        assert!(username.contains(":SecretString:username::}}"));
        assert!(!username.contains("\"admin\""));
    }

    #[test]
    fn test_default_teardown_is_destroy() {
        let (database, template) = declared(&StackConfig::new("shop", "admin"));
        let instance = template.resource(&database.instance).unwrap();

        assert_eq!(instance.property("DeletionProtection").unwrap(), false);
        assert_eq!(instance.deletion_policy.as_deref(), Some("Delete"));
        assert_eq!(instance.update_replace_policy.as_deref(), Some("Delete"));
    }

    #[test]
    fn test_snapshot_teardown_with_protection() {
        let mut config = StackConfig::new("shop", "admin");
        config.teardown.removal_policy = RemovalPolicy::Snapshot;
        config.teardown.deletion_protection = true;
        let (database, template) = declared(&config);
        let instance = template.resource(&database.instance).unwrap();

        assert_eq!(instance.property("DeletionProtection").unwrap(), true);
        assert_eq!(instance.deletion_policy.as_deref(), Some("Snapshot"));
    }
}
