//! # Topology Tests
//!
//! Properties of the synthesized template that must hold for every valid
//! configuration:
//! - Exactly one of each top-level component and one database firewall rule
//! - The firewall rule's source is the service's security group
//! - Connection settings reference the database and secret they describe
//! - The database is private and encrypted
//! - The password never appears as a plaintext value
//! - Default teardown needs no manual step
//! - Subnets never overlap and private egress stays in-zone
//! - Synthesis is deterministic

use bookstore_stack::config::{NetworkSettings, StackConfig};
use bookstore_stack::template::{OutputFormat, Template};
use bookstore_stack::topology::{synthesize, Topology};
use serde_json::{json, Value as Json};

const SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";
const DB_INSTANCE: &str = "AWS::RDS::DBInstance";

fn rendered(config: &StackConfig) -> Json {
    let template = synthesize(config).expect("valid configuration should synthesize");
    serde_json::from_str(&template.to_json().unwrap()).unwrap()
}

fn single_of_type<'a>(template: &'a Template, kind: &'a str) -> &'a bookstore_stack::template::Resource {
    let mut matches = template.resources_of_type(kind);
    let (_, resource) = matches
        .next()
        .unwrap_or_else(|| panic!("no resource of type {kind}"));
    assert!(matches.next().is_none(), "more than one resource of type {kind}");
    resource
}

#[test]
fn test_exactly_one_of_each_component() {
    let configs = [
        StackConfig::new("shop", "admin"),
        StackConfig::new("Bookstore", "book_admin"),
        StackConfig::new("inventory2", "svc"),
    ];

    for config in &configs {
        let template = synthesize(config).unwrap();
        for (kind, expected) in [
            ("AWS::EC2::VPC", 1),
            ("AWS::ECS::Cluster", 1),
            ("AWS::ECS::Service", 1),
            ("AWS::ECS::TaskDefinition", 1),
            ("AWS::ElasticLoadBalancingV2::LoadBalancer", 1),
            (DB_INSTANCE, 1),
            ("AWS::SecretsManager::Secret", 1),
            ("AWS::SecretsManager::SecretTargetAttachment", 1),
            (SECURITY_GROUP_INGRESS, 1),
            // Load balancer, service and database groups
            ("AWS::EC2::SecurityGroup", 3),
        ] {
            assert_eq!(
                template.count_of_type(kind),
                expected,
                "{kind} count for database {}",
                config.database_name
            );
        }
    }
}

#[test]
fn test_firewall_rule_source_is_service_group() {
    let topology = Topology::declare(&StackConfig::new("shop", "admin")).unwrap();
    let template = topology.synthesize().unwrap();
    let rule = single_of_type(&template, SECURITY_GROUP_INGRESS);

    let service_group = topology.service.security_group.as_str();
    assert_eq!(
        rule.property("SourceSecurityGroupId").unwrap(),
        &json!({"Fn::GetAtt": [service_group, "GroupId"]})
    );
    assert!(rule.property("CidrIp").is_none(), "rule must not use an address range");
    assert_eq!(rule.property("FromPort").unwrap(), 3306);
    assert_eq!(rule.property("ToPort").unwrap(), 3306);
    assert_eq!(rule.property("IpProtocol").unwrap(), "tcp");

    // The rule guards the group the database actually uses
    let instance = single_of_type(&template, DB_INSTANCE);
    assert_eq!(
        instance.property("VPCSecurityGroups").unwrap(),
        &json!([rule.property("GroupId").unwrap()])
    );
}

#[test]
fn test_components_are_wired_by_reference() {
    let topology = Topology::declare(&StackConfig::new("shop", "admin")).unwrap();

    let policy = &topology.access_policy;
    assert!(policy.source.references(&topology.service.security_group));
    assert!(!policy.source.references(&topology.service.load_balancer_security_group));

    let container = &topology.service.container;
    let password = container
        .secrets
        .iter()
        .find(|s| s.name == "DB_PASSWORD")
        .expect("password secret injected");
    assert!(password.value_from.references(&topology.credentials.secret));

    let host = container
        .environment
        .iter()
        .find(|v| v.name == "DB_HOST")
        .expect("host variable injected");
    assert!(host.value.references(&topology.database.instance));
    assert!(!host.value.references(&topology.credentials.secret));
}

#[test]
fn test_database_private_and_encrypted() {
    for removal in ["destroy", "retain", "snapshot"] {
        let mut config = StackConfig::new("shop", "admin");
        config.teardown.removal_policy = removal.parse().unwrap();
        let template = synthesize(&config).unwrap();
        let instance = single_of_type(&template, DB_INSTANCE);

        assert_eq!(instance.property("PubliclyAccessible").unwrap(), false);
        assert_eq!(instance.property("StorageEncrypted").unwrap(), true);
    }
}

#[test]
fn test_password_never_plaintext() {
    let doc = rendered(&StackConfig::new("shop", "admin"));
    let containers = doc["Resources"]
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["Type"] == "AWS::ECS::TaskDefinition")
        .map(|r| r["Properties"]["ContainerDefinitions"].clone())
        .unwrap();
    let container = &containers[0];

    let environment = container["Environment"].as_array().unwrap();
    let names: Vec<&str> = environment.iter().map(|e| e["Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["DB_HOST", "DB_NAME", "DB_USER"]);
    assert!(!names.contains(&"DB_PASSWORD"));

    let secrets = container["Secrets"].as_array().unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0]["Name"], "DB_PASSWORD");
    assert!(secrets[0]["ValueFrom"].to_string().contains(":password::"));

    // No property anywhere carries a literal password value
    let text = doc.to_string();
    assert!(!text.contains("\"SecretString\""));
    assert!(!text.contains("\"MasterUserPassword\":\""));
}

#[test]
fn test_secret_name_and_template_for_shop_admin() {
    let template = synthesize(&StackConfig::new("shop", "admin")).unwrap();
    let secret = single_of_type(&template, "AWS::SecretsManager::Secret");

    assert_eq!(secret.property("Name").unwrap(), "shopCredentials");
    let generate = secret.property("GenerateSecretString").unwrap();
    let secret_template: Json =
        serde_json::from_str(generate["SecretStringTemplate"].as_str().unwrap()).unwrap();
    assert_eq!(secret_template, json!({"username": "admin"}));
    assert_eq!(generate["GenerateStringKey"], "password");
}

#[test]
fn test_default_teardown_needs_no_manual_step() {
    let template = synthesize(&StackConfig::new("shop", "admin")).unwrap();
    let instance = single_of_type(&template, DB_INSTANCE);

    assert_eq!(instance.property("DeletionProtection").unwrap(), false);
    assert_eq!(instance.deletion_policy.as_deref(), Some("Delete"));
}

#[test]
fn test_subnets_disjoint_and_private_egress_in_zone() {
    let config = StackConfig {
        network: NetworkSettings {
            max_azs: 3,
            subnet_cidr_mask: 20,
        },
        ..StackConfig::new("shop", "admin")
    };
    let topology = Topology::declare(&config).unwrap();
    let network = &topology.network;

    let mut cidrs: Vec<&str> = network
        .public_subnets
        .iter()
        .chain(&network.private_subnets)
        .map(|s| s.cidr.as_str())
        .collect();
    assert_eq!(cidrs.len(), 6);
    cidrs.sort_unstable();
    cidrs.dedup();
    assert_eq!(cidrs.len(), 6, "subnet ranges must be distinct");

    let template = topology.synthesize().unwrap();
    for private in &network.private_subnets {
        let public = network
            .public_subnets
            .iter()
            .find(|p| p.zone == private.zone)
            .unwrap();
        let nat = &public.nat.as_ref().unwrap().gateway;

        let route = template.resource(&private.default_route).unwrap();
        assert_eq!(
            route.property("NatGatewayId").unwrap(),
            &json!({"Ref": nat.as_str()}),
            "private subnet in zone {} must egress through its own zone's NAT",
            private.zone
        );
    }
}

#[test]
fn test_synthesis_is_deterministic() {
    let mut config = StackConfig::new("shop", "admin");
    config.emit_outputs = true;

    for format in [OutputFormat::Json, OutputFormat::Yaml] {
        let first = synthesize(&config).unwrap().render(format).unwrap();
        let second = synthesize(&config).unwrap().render(format).unwrap();
        assert_eq!(first, second, "{format} output differs between runs");
    }
}

#[test]
fn test_outputs_never_include_password() {
    let mut config = StackConfig::new("shop", "admin");
    config.emit_outputs = true;
    let doc = rendered(&config);

    let outputs = doc["Outputs"].as_object().unwrap();
    assert_eq!(outputs.len(), 4);
    assert_eq!(outputs["DatabaseName"]["Value"], "shop");
    assert_eq!(outputs["DatabaseUsername"]["Value"], "admin");
    assert!(!doc["Outputs"].to_string().to_lowercase().contains("password"));
}

#[test]
fn test_stack_name_flows_into_metadata() {
    let mut config = StackConfig::new("shop", "admin");
    config.stack_name = "bookstore-dev".to_string();
    let doc = rendered(&config);

    assert_eq!(doc["Metadata"]["Bookstore::Synth"]["StackName"], "bookstore-dev");
    assert!(doc["Description"].as_str().unwrap().starts_with("bookstore-dev"));
    // Logical IDs do not depend on the stack name
    assert!(doc["Resources"]["BookstoreDatabase"].is_object());
}
