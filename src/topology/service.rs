//! # Load-Balanced Service
//!
//! A Fargate service fronted by a public application load balancer.
//!
//! Traffic path: internet -> load balancer security group (TCP 80 from
//! anywhere) -> listener -> IP target group -> service security group
//! (TCP 80 from the load balancer group only) -> task in a private subnet.
//!
//! The service's security group is its network identity; downstream
//! firewall rules reference it rather than any address range.

use super::cluster::ComputeCluster;
use super::common::{
    kinds, EgressRule, IngressRule, PolicyDocument, PolicyProps, PolicyStatement, Protocol,
    RoleProps, SecurityGroupProps, ANY_IPV4,
};
use super::network::NetworkSegment;
use super::Declaration;
use crate::constants::{
    CONTAINER_NAME, CONTAINER_PORT, SERVICE_DESIRED_COUNT, TASK_CPU, TASK_MEMORY_MIB,
};
use crate::template::intrinsic::pseudo;
use crate::template::{LogicalId, Resource, Scope, SynthError, Template, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Plain environment variable of a container
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValuePair {
    pub name: String,
    pub value: Value,
}

/// Secret-backed environment variable, resolved by the container runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSecret {
    pub name: String,
    pub value_from: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogConfiguration {
    pub log_driver: &'static str,
    pub options: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub port_mappings: Vec<PortMapping>,
    pub log_configuration: LogConfiguration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<ContainerSecret>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancedService {
    pub load_balancer: LogicalId,
    pub load_balancer_security_group: LogicalId,
    pub listener: LogicalId,
    pub target_group: LogicalId,
    pub log_group: LogicalId,
    pub task_role: LogicalId,
    pub execution_role: LogicalId,
    pub execution_policy: LogicalId,
    pub task_definition: LogicalId,
    pub security_group: LogicalId,
    pub service: LogicalId,
    /// The single container of the task definition
    pub container: ContainerDefinition,
    /// Statements of the execution role's inline policy
    pub execution_statements: Vec<PolicyStatement>,
    cluster: Value,
    vpc: Value,
    public_subnets: Vec<Value>,
    private_subnets: Vec<Value>,
    public_routes: Vec<LogicalId>,
}

impl LoadBalancedService {
    pub fn new(
        scope: &Scope,
        cluster: &ComputeCluster,
        network: &NetworkSegment,
        image: &str,
    ) -> Self {
        let lb_scope = scope.child("LB");
        let task_scope = scope.child("TaskDef");
        let service_scope = scope.child("Service");

        let log_group = task_scope.child(CONTAINER_NAME).id("LogGroup");
        let execution_role = task_scope.id("ExecutionRole");

        let container = ContainerDefinition {
            name: CONTAINER_NAME.to_string(),
            image: image.to_string(),
            essential: true,
            port_mappings: vec![PortMapping {
                container_port: CONTAINER_PORT,
                protocol: Protocol::Tcp,
            }],
            log_configuration: LogConfiguration {
                log_driver: "awslogs",
                options: BTreeMap::from([
                    ("awslogs-group".to_string(), Value::reference(&log_group)),
                    (
                        "awslogs-stream-prefix".to_string(),
                        Value::literal(scope.logical_id().as_str()),
                    ),
                    ("awslogs-region".to_string(), Value::pseudo(pseudo::REGION)),
                ]),
            },
            environment: Vec::new(),
            secrets: Vec::new(),
        };

        let execution_statements = vec![PolicyStatement::allow(
            &["logs:CreateLogStream", "logs:PutLogEvents"],
            Value::get_att(&log_group, "Arn"),
        )];

        debug!(image, "Declared load-balanced service");

        Self {
            load_balancer: lb_scope.logical_id(),
            load_balancer_security_group: lb_scope.id("SecurityGroup"),
            listener: lb_scope.id("PublicListener"),
            target_group: lb_scope.child("PublicListener").id("ECSGroup"),
            log_group,
            task_role: task_scope.id("TaskRole"),
            execution_policy: task_scope.child("ExecutionRole").id("DefaultPolicy"),
            execution_role,
            task_definition: task_scope.logical_id(),
            security_group: service_scope.id("SecurityGroup"),
            service: service_scope.id("Service"),
            container,
            execution_statements,
            cluster: cluster.cluster_ref(),
            vpc: network.vpc_ref(),
            public_subnets: network.public_subnet_refs(),
            private_subnets: network.private_subnet_refs(),
            public_routes: network.public_routes(),
        }
    }

    /// Security group ID the service's tasks run with
    pub fn network_identity(&self) -> Value {
        Value::get_att(&self.security_group, "GroupId")
    }

    pub fn load_balancer_dns(&self) -> Value {
        Value::get_att(&self.load_balancer, "DNSName")
    }

    /// Allow the execution role to perform `actions` on `resource`
    pub fn grant_execution(&mut self, actions: &[&str], resource: Value) {
        self.execution_statements
            .push(PolicyStatement::allow(actions, resource));
    }

    fn emit_load_balancer(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.load_balancer_security_group.clone(),
            Resource::new(
                &self.load_balancer_security_group,
                kinds::SECURITY_GROUP,
                &SecurityGroupProps {
                    group_description: "Load balancer security group".to_string(),
                    vpc_id: self.vpc.clone(),
                    security_group_ingress: vec![IngressRule::from_cidr(
                        ANY_IPV4,
                        Protocol::Tcp,
                        CONTAINER_PORT,
                        "Allow from anyone on port 80",
                    )],
                    security_group_egress: vec![EgressRule::allow_all()],
                },
            )?,
        )?;

        template.add(
            self.load_balancer.clone(),
            Resource::new(
                &self.load_balancer,
                kinds::LOAD_BALANCER,
                &LoadBalancerProps {
                    kind: "application",
                    scheme: "internet-facing",
                    subnets: self.public_subnets.clone(),
                    security_groups: vec![Value::get_att(
                        &self.load_balancer_security_group,
                        "GroupId",
                    )],
                    load_balancer_attributes: vec![Attribute::new(
                        "deletion_protection.enabled",
                        "false",
                    )],
                },
            )?
            // An internet-facing load balancer needs working public routes
            .depends_on(self.public_routes.iter().cloned()),
        )?;

        template.add(
            self.target_group.clone(),
            Resource::new(
                &self.target_group,
                kinds::TARGET_GROUP,
                &TargetGroupProps {
                    port: CONTAINER_PORT,
                    protocol: "HTTP",
                    target_type: "ip",
                    vpc_id: self.vpc.clone(),
                    target_group_attributes: vec![Attribute::new(
                        "stickiness.enabled",
                        "false",
                    )],
                },
            )?,
        )?;

        template.add(
            self.listener.clone(),
            Resource::new(
                &self.listener,
                kinds::LISTENER,
                &ListenerProps {
                    load_balancer_arn: Value::reference(&self.load_balancer),
                    port: CONTAINER_PORT,
                    protocol: "HTTP",
                    default_actions: vec![ListenerAction {
                        kind: "forward",
                        target_group_arn: Value::reference(&self.target_group),
                    }],
                },
            )?,
        )
    }

    fn emit_task_definition(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.log_group.clone(),
            Resource::new(&self.log_group, kinds::LOG_GROUP, &serde_json::Map::new())?
                .removal_policy("Retain"),
        )?;

        for role in [&self.task_role, &self.execution_role] {
            template.add(
                role.clone(),
                Resource::new(
                    role,
                    kinds::IAM_ROLE,
                    &RoleProps {
                        assume_role_policy_document: PolicyDocument::assumed_by(
                            "ecs-tasks.amazonaws.com",
                        ),
                        managed_policy_arns: Vec::new(),
                    },
                )?,
            )?;
        }

        template.add(
            self.execution_policy.clone(),
            Resource::new(
                &self.execution_policy,
                kinds::IAM_POLICY,
                &PolicyProps {
                    policy_name: self.execution_policy.to_string(),
                    policy_document: PolicyDocument::new(self.execution_statements.clone()),
                    roles: vec![Value::reference(&self.execution_role)],
                },
            )?,
        )?;

        template.add(
            self.task_definition.clone(),
            Resource::new(
                &self.task_definition,
                kinds::TASK_DEFINITION,
                &TaskDefinitionProps {
                    family: self.task_definition.to_string(),
                    cpu: TASK_CPU.to_string(),
                    memory: TASK_MEMORY_MIB.to_string(),
                    network_mode: "awsvpc",
                    requires_compatibilities: vec!["FARGATE"],
                    execution_role_arn: Value::get_att(&self.execution_role, "Arn"),
                    task_role_arn: Value::get_att(&self.task_role, "Arn"),
                    container_definitions: vec![self.container.clone()],
                },
            )?,
        )
    }

    fn emit_service(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.security_group.clone(),
            Resource::new(
                &self.security_group,
                kinds::SECURITY_GROUP,
                &SecurityGroupProps {
                    group_description: "Service security group".to_string(),
                    vpc_id: self.vpc.clone(),
                    security_group_ingress: vec![IngressRule::from_group(
                        Value::get_att(&self.load_balancer_security_group, "GroupId"),
                        Protocol::Tcp,
                        CONTAINER_PORT,
                        "Load balancer to target",
                    )],
                    security_group_egress: vec![EgressRule::allow_all()],
                },
            )?,
        )?;

        template.add(
            self.service.clone(),
            Resource::new(
                &self.service,
                kinds::ECS_SERVICE,
                &ServiceProps {
                    cluster: self.cluster.clone(),
                    launch_type: "FARGATE",
                    desired_count: SERVICE_DESIRED_COUNT,
                    task_definition: Value::reference(&self.task_definition),
                    health_check_grace_period_seconds: 60,
                    deployment_configuration: DeploymentConfiguration {
                        maximum_percent: 200,
                        minimum_healthy_percent: 50,
                    },
                    load_balancers: vec![ServiceLoadBalancer {
                        container_name: self.container.name.clone(),
                        container_port: CONTAINER_PORT,
                        target_group_arn: Value::reference(&self.target_group),
                    }],
                    network_configuration: NetworkConfiguration {
                        awsvpc_configuration: AwsvpcConfiguration {
                            assign_public_ip: "DISABLED",
                            security_groups: vec![self.network_identity()],
                            subnets: self.private_subnets.clone(),
                        },
                    },
                },
            )?
            .depends_on([self.listener.clone(), self.task_role.clone()]),
        )
    }
}

impl Declaration for LoadBalancedService {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        self.emit_load_balancer(template)?;
        self.emit_task_definition(template)?;
        self.emit_service(template)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Attribute {
    key: &'static str,
    value: &'static str,
}

impl Attribute {
    fn new(key: &'static str, value: &'static str) -> Self {
        Self { key, value }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerProps {
    #[serde(rename = "Type")]
    kind: &'static str,
    scheme: &'static str,
    subnets: Vec<Value>,
    security_groups: Vec<Value>,
    load_balancer_attributes: Vec<Attribute>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TargetGroupProps {
    port: u16,
    protocol: &'static str,
    target_type: &'static str,
    vpc_id: Value,
    target_group_attributes: Vec<Attribute>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListenerAction {
    #[serde(rename = "Type")]
    kind: &'static str,
    target_group_arn: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListenerProps {
    load_balancer_arn: Value,
    port: u16,
    protocol: &'static str,
    default_actions: Vec<ListenerAction>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TaskDefinitionProps {
    family: String,
    cpu: String,
    memory: String,
    network_mode: &'static str,
    requires_compatibilities: Vec<&'static str>,
    execution_role_arn: Value,
    task_role_arn: Value,
    container_definitions: Vec<ContainerDefinition>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeploymentConfiguration {
    maximum_percent: u32,
    minimum_healthy_percent: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceLoadBalancer {
    container_name: String,
    container_port: u16,
    target_group_arn: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AwsvpcConfiguration {
    assign_public_ip: &'static str,
    security_groups: Vec<Value>,
    subnets: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkConfiguration {
    awsvpc_configuration: AwsvpcConfiguration,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceProps {
    cluster: Value,
    launch_type: &'static str,
    desired_count: u32,
    task_definition: Value,
    health_check_grace_period_seconds: u32,
    deployment_configuration: DeploymentConfiguration,
    load_balancers: Vec<ServiceLoadBalancer>,
    network_configuration: NetworkConfiguration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkSettings;
    use crate::constants::CONTAINER_IMAGE;
    use serde_json::json;

    fn declared() -> (LoadBalancedService, Template) {
        let root = Scope::root("Test");
        let network = NetworkSegment::new(&root.child("BookStoreVpc"), &NetworkSettings::default());
        let cluster = ComputeCluster::new(&root.child("BookStoreCluster"), &network);
        let service = LoadBalancedService::new(
            &root.child("BookStoreFargate"),
            &cluster,
            &network,
            CONTAINER_IMAGE,
        );
        let mut template = Template::new("Test");
        service.emit(&mut template).unwrap();
        (service, template)
    }

    #[test]
    fn test_single_container_with_fixed_image() {
        let (service, template) = declared();
        let task = template.resource(&service.task_definition).unwrap();
        let containers = task.property("ContainerDefinitions").unwrap().as_array().unwrap();

        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0]["Image"], CONTAINER_IMAGE);
        assert_eq!(containers[0]["PortMappings"], json!([{"ContainerPort": 80, "Protocol": "tcp"}]));
        assert_eq!(task.property("NetworkMode").unwrap(), "awsvpc");
        assert_eq!(task.property("Cpu").unwrap(), "256");
        assert_eq!(task.property("Memory").unwrap(), "512");
    }

    #[test]
    fn test_load_balancer_is_public_and_tasks_are_private() {
        let (service, template) = declared();

        let lb = template.resource(&service.load_balancer).unwrap();
        assert_eq!(lb.property("Scheme").unwrap(), "internet-facing");
        assert_eq!(lb.depends_on.len(), 2, "must wait for both public default routes");

        let svc = template.resource(&service.service).unwrap();
        let awsvpc = &svc.property("NetworkConfiguration").unwrap()["AwsvpcConfiguration"];
        assert_eq!(awsvpc["AssignPublicIp"], "DISABLED");
        assert_eq!(awsvpc["Subnets"].as_array().unwrap().len(), 2);
        assert_eq!(
            awsvpc["SecurityGroups"],
            json!([serde_json::to_value(service.network_identity()).unwrap()])
        );
        assert!(svc.depends_on.contains(&service.listener));
    }

    #[test]
    fn test_service_group_only_admits_load_balancer() {
        let (service, template) = declared();
        let sg = template.resource(&service.security_group).unwrap();
        let ingress = sg.property("SecurityGroupIngress").unwrap().as_array().unwrap();

        assert_eq!(ingress.len(), 1);
        assert!(ingress[0].get("CidrIp").is_none());
        assert_eq!(
            ingress[0]["SourceSecurityGroupId"],
            json!({"Fn::GetAtt": [service.load_balancer_security_group.as_str(), "GroupId"]})
        );
    }

    #[test]
    fn test_grant_execution_extends_policy() {
        let (mut service, _) = declared();
        service.grant_execution(&["secretsmanager:GetSecretValue"], Value::Ref("Secret".into()));

        let mut template = Template::new("Test");
        service.emit(&mut template).unwrap();
        let policy = template.resource(&service.execution_policy).unwrap();
        let statements = policy.property("PolicyDocument").unwrap()["Statement"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1]["Resource"], json!({"Ref": "Secret"}));
    }
}
