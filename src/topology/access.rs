//! # Database Access Policy
//!
//! The database's security group and the single rule that admits the
//! service. The rule names the service's security group as its source, never
//! an address range, so only members of that group reach port 3306.

use super::common::{kinds, EgressRule, Protocol, SecurityGroupProps};
use super::network::NetworkSegment;
use super::service::LoadBalancedService;
use super::Declaration;
use crate::constants::{DB_INGRESS_DESCRIPTION, DB_PORT, DB_SECURITY_GROUP_DESCRIPTION};
use crate::template::{LogicalId, Resource, Scope, SynthError, Template, Value};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseAccessPolicy {
    /// Security group attached to the database instance
    pub security_group: LogicalId,
    pub ingress_rule: LogicalId,
    /// Network identity of the admitted source
    pub source: Value,
    pub port: u16,
    pub protocol: Protocol,
    vpc: Value,
}

impl DatabaseAccessPolicy {
    pub fn new(scope: &Scope, network: &NetworkSegment, service: &LoadBalancedService) -> Self {
        Self {
            security_group: scope.logical_id(),
            ingress_rule: scope.id("MySqlFromFargate"),
            source: service.network_identity(),
            port: DB_PORT,
            protocol: Protocol::Tcp,
            vpc: network.vpc_ref(),
        }
    }

    /// Security group ID to attach to the database
    pub fn group_id(&self) -> Value {
        Value::get_att(&self.security_group, "GroupId")
    }
}

impl Declaration for DatabaseAccessPolicy {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.security_group.clone(),
            Resource::new(
                &self.security_group,
                kinds::SECURITY_GROUP,
                &SecurityGroupProps {
                    group_description: DB_SECURITY_GROUP_DESCRIPTION.to_string(),
                    vpc_id: self.vpc.clone(),
                    security_group_ingress: Vec::new(),
                    security_group_egress: vec![EgressRule::allow_all()],
                },
            )?,
        )?;

        template.add(
            self.ingress_rule.clone(),
            Resource::new(
                &self.ingress_rule,
                kinds::SECURITY_GROUP_INGRESS,
                &IngressProps {
                    group_id: self.group_id(),
                    source_security_group_id: self.source.clone(),
                    ip_protocol: self.protocol,
                    from_port: self.port,
                    to_port: self.port,
                    description: DB_INGRESS_DESCRIPTION,
                },
            )?,
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IngressProps {
    group_id: Value,
    source_security_group_id: Value,
    ip_protocol: Protocol,
    from_port: u16,
    to_port: u16,
    description: &'static str,
}
