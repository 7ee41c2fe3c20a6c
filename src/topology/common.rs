//! # Common Resource Properties
//!
//! Property shapes shared by several components: security groups and their
//! rules, IAM roles and policy documents.

use crate::template::Value;
use serde::Serialize;
use std::fmt;

/// Resource type names
pub mod kinds {
    pub const VPC: &str = "AWS::EC2::VPC";
    pub const SUBNET: &str = "AWS::EC2::Subnet";
    pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
    pub const ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
    pub const ROUTE: &str = "AWS::EC2::Route";
    pub const EIP: &str = "AWS::EC2::EIP";
    pub const NAT_GATEWAY: &str = "AWS::EC2::NatGateway";
    pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
    pub const GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
    pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
    pub const SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";
    pub const ECS_CLUSTER: &str = "AWS::ECS::Cluster";
    pub const ECS_SERVICE: &str = "AWS::ECS::Service";
    pub const TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
    pub const LOAD_BALANCER: &str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
    pub const LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
    pub const TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
    pub const LOG_GROUP: &str = "AWS::Logs::LogGroup";
    pub const IAM_ROLE: &str = "AWS::IAM::Role";
    pub const IAM_POLICY: &str = "AWS::IAM::Policy";
    pub const SECRET: &str = "AWS::SecretsManager::Secret";
    pub const SECRET_ATTACHMENT: &str = "AWS::SecretsManager::SecretTargetAttachment";
    pub const DB_INSTANCE: &str = "AWS::RDS::DBInstance";
    pub const DB_SUBNET_GROUP: &str = "AWS::RDS::DBSubnetGroup";
}

/// Any IPv4 address
pub const ANY_IPV4: &str = "0.0.0.0/0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    /// Every protocol (`-1`), only meaningful for egress
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProps {
    pub group_description: String,
    pub vpc_id: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ingress: Vec<IngressRule>,
    pub security_group_egress: Vec<EgressRule>,
}

/// Inline ingress rule; exactly one of `cidr_ip` / `source_security_group_id`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngressRule {
    pub ip_protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_security_group_id: Option<Value>,
    pub description: String,
}

impl IngressRule {
    pub fn from_cidr(cidr: &str, protocol: Protocol, port: u16, description: &str) -> Self {
        Self {
            ip_protocol: protocol,
            from_port: port,
            to_port: port,
            cidr_ip: Some(cidr.to_string()),
            source_security_group_id: None,
            description: description.to_string(),
        }
    }

    pub fn from_group(group_id: Value, protocol: Protocol, port: u16, description: &str) -> Self {
        Self {
            ip_protocol: protocol,
            from_port: port,
            to_port: port,
            cidr_ip: None,
            source_security_group_id: Some(group_id),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub cidr_ip: String,
    pub ip_protocol: Protocol,
    pub description: String,
}

impl EgressRule {
    pub fn allow_all() -> Self {
        Self {
            cidr_ip: ANY_IPV4.to_string(),
            ip_protocol: Protocol::All,
            description: "Allow all outbound traffic by default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: "2012-10-17",
            statement,
        }
    }

    /// Trust policy letting an AWS service assume the role
    pub fn assumed_by(service: &str) -> Self {
        Self::new(vec![PolicyStatement {
            effect: "Allow",
            principal: Some(ServicePrincipal {
                service: service.to_string(),
            }),
            action: vec!["sts:AssumeRole".to_string()],
            resource: None,
        }])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<ServicePrincipal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resource: Value) -> Self {
        Self {
            effect: "Allow",
            principal: None,
            action: actions.iter().map(|a| (*a).to_string()).collect(),
            resource: Some(resource),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePrincipal {
    pub service: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProps {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProps {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
    pub roles: Vec<Value>,
}
