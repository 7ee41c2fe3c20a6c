//! # Network Segment
//!
//! A VPC with one public and one private subnet per availability zone.
//!
//! Subnet ranges are carved sequentially from the VPC range: public subnets
//! first, then private ones, each of the configured prefix length. Every
//! public subnet hosts a NAT gateway; the private subnet of the same zone
//! routes its egress through it.

use super::common::{kinds, ANY_IPV4};
use super::Declaration;
use crate::config::NetworkSettings;
use crate::constants::VPC_CIDR;
use crate::template::{LogicalId, Resource, Scope, SynthError, Tag, Template, Value};
use serde::Serialize;
use std::net::Ipv4Addr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetKind {
    Public,
    Private,
}

impl SubnetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetKind::Public => "Public",
            SubnetKind::Private => "Private",
        }
    }
}

/// Where a subnet's default route points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Egress {
    InternetGateway,
    Nat(LogicalId),
}

/// NAT gateway and its elastic IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGateway {
    pub eip: LogicalId,
    pub gateway: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub kind: SubnetKind,
    /// Zero-based availability zone index
    pub zone: u8,
    pub cidr: String,
    pub subnet: LogicalId,
    pub route_table: LogicalId,
    pub association: LogicalId,
    pub default_route: LogicalId,
    pub egress: Egress,
    /// Present on public subnets only
    pub nat: Option<NatGateway>,
    name_tag: String,
}

impl Subnet {
    fn public(network: &Scope, zone: u8, cidr: String) -> Self {
        let scope = subnet_scope(network, SubnetKind::Public, zone);
        let nat = NatGateway {
            eip: scope.id("EIP"),
            gateway: scope.id("NATGateway"),
        };
        Self::new(&scope, SubnetKind::Public, zone, cidr, Egress::InternetGateway, Some(nat))
    }

    fn private(network: &Scope, zone: u8, cidr: String) -> Self {
        let scope = subnet_scope(network, SubnetKind::Private, zone);
        // The public subnet of the same zone hosts the NAT gateway
        let nat = subnet_scope(network, SubnetKind::Public, zone).id("NATGateway");
        Self::new(&scope, SubnetKind::Private, zone, cidr, Egress::Nat(nat), None)
    }

    fn new(
        scope: &Scope,
        kind: SubnetKind,
        zone: u8,
        cidr: String,
        egress: Egress,
        nat: Option<NatGateway>,
    ) -> Self {
        Self {
            kind,
            zone,
            cidr,
            subnet: scope.id("Subnet"),
            route_table: scope.id("RouteTable"),
            association: scope.id("RouteTableAssociation"),
            default_route: scope.id("DefaultRoute"),
            egress,
            nat,
            name_tag: scope.path(),
        }
    }

    pub fn subnet_ref(&self) -> Value {
        Value::reference(&self.subnet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSegment {
    pub vpc: LogicalId,
    pub cidr: String,
    pub internet_gateway: LogicalId,
    pub gateway_attachment: LogicalId,
    pub public_subnets: Vec<Subnet>,
    pub private_subnets: Vec<Subnet>,
    name_tag: String,
}

impl NetworkSegment {
    pub fn new(scope: &Scope, settings: &NetworkSettings) -> Self {
        let zones = settings.max_azs;
        let mask = settings.subnet_cidr_mask;

        let public_subnets = (0..zones)
            .map(|zone| Subnet::public(scope, zone, subnet_cidr(u32::from(zone), mask)))
            .collect();
        let private_subnets = (0..zones)
            .map(|zone| {
                let index = u32::from(zones) + u32::from(zone);
                Subnet::private(scope, zone, subnet_cidr(index, mask))
            })
            .collect();

        debug!(zones, mask, "Declared network segment");

        Self {
            vpc: scope.logical_id(),
            cidr: VPC_CIDR.to_string(),
            internet_gateway: scope.id("IGW"),
            gateway_attachment: scope.id("VPCGW"),
            public_subnets,
            private_subnets,
            name_tag: scope.path(),
        }
    }

    pub fn vpc_ref(&self) -> Value {
        Value::reference(&self.vpc)
    }

    pub fn public_subnet_refs(&self) -> Vec<Value> {
        self.public_subnets.iter().map(Subnet::subnet_ref).collect()
    }

    pub fn private_subnet_refs(&self) -> Vec<Value> {
        self.private_subnets.iter().map(Subnet::subnet_ref).collect()
    }

    /// Public default routes; internet-facing resources must wait for them
    pub fn public_routes(&self) -> Vec<LogicalId> {
        self.public_subnets
            .iter()
            .map(|s| s.default_route.clone())
            .collect()
    }

    #[cfg(test)]
    fn nat_for_zone(&self, zone: u8) -> Option<&NatGateway> {
        self.public_subnets
            .iter()
            .find(|s| s.zone == zone)
            .and_then(|s| s.nat.as_ref())
    }

    fn emit_subnet(&self, template: &mut Template, subnet: &Subnet) -> Result<(), SynthError> {
        let public = subnet.kind == SubnetKind::Public;
        let tags = vec![
            Tag {
                key: "bookstore:subnet-type".to_string(),
                value: subnet.kind.as_str().to_string(),
            },
            Tag::name(subnet.name_tag.clone()),
        ];

        template.add(
            subnet.subnet.clone(),
            Resource::new(
                &subnet.subnet,
                kinds::SUBNET,
                &SubnetProps {
                    vpc_id: self.vpc_ref(),
                    availability_zone: Value::availability_zone(u32::from(subnet.zone)),
                    cidr_block: subnet.cidr.clone(),
                    map_public_ip_on_launch: public,
                    tags,
                },
            )?,
        )?;

        template.add(
            subnet.route_table.clone(),
            Resource::new(
                &subnet.route_table,
                kinds::ROUTE_TABLE,
                &RouteTableProps {
                    vpc_id: self.vpc_ref(),
                    tags: vec![Tag::name(subnet.name_tag.clone())],
                },
            )?,
        )?;

        template.add(
            subnet.association.clone(),
            Resource::new(
                &subnet.association,
                kinds::ROUTE_TABLE_ASSOCIATION,
                &AssociationProps {
                    route_table_id: Value::reference(&subnet.route_table),
                    subnet_id: subnet.subnet_ref(),
                },
            )?,
        )?;

        let (gateway_id, nat_gateway_id) = match &subnet.egress {
            Egress::InternetGateway => (Some(Value::reference(&self.internet_gateway)), None),
            Egress::Nat(nat) => (None, Some(Value::reference(nat))),
        };
        let mut route = Resource::new(
            &subnet.default_route,
            kinds::ROUTE,
            &RouteProps {
                route_table_id: Value::reference(&subnet.route_table),
                destination_cidr_block: ANY_IPV4,
                gateway_id,
                nat_gateway_id,
            },
        )?;
        if subnet.egress == Egress::InternetGateway {
            route = route.depends_on([self.gateway_attachment.clone()]);
        }
        template.add(subnet.default_route.clone(), route)?;

        if let Some(nat) = &subnet.nat {
            template.add(
                nat.eip.clone(),
                Resource::new(
                    &nat.eip,
                    kinds::EIP,
                    &EipProps {
                        domain: "vpc",
                        tags: vec![Tag::name(subnet.name_tag.clone())],
                    },
                )?,
            )?;
            template.add(
                nat.gateway.clone(),
                Resource::new(
                    &nat.gateway,
                    kinds::NAT_GATEWAY,
                    &NatGatewayProps {
                        subnet_id: subnet.subnet_ref(),
                        allocation_id: Value::get_att(&nat.eip, "AllocationId"),
                        tags: vec![Tag::name(subnet.name_tag.clone())],
                    },
                )?
                .depends_on([subnet.default_route.clone(), subnet.association.clone()]),
            )?;
        }
        Ok(())
    }
}

impl Declaration for NetworkSegment {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.vpc.clone(),
            Resource::new(
                &self.vpc,
                kinds::VPC,
                &VpcProps {
                    cidr_block: self.cidr.clone(),
                    enable_dns_hostnames: true,
                    enable_dns_support: true,
                    instance_tenancy: "default",
                    tags: vec![Tag::name(self.name_tag.clone())],
                },
            )?,
        )?;

        template.add(
            self.internet_gateway.clone(),
            Resource::new(
                &self.internet_gateway,
                kinds::INTERNET_GATEWAY,
                &InternetGatewayProps {
                    tags: vec![Tag::name(self.name_tag.clone())],
                },
            )?,
        )?;
        template.add(
            self.gateway_attachment.clone(),
            Resource::new(
                &self.gateway_attachment,
                kinds::GATEWAY_ATTACHMENT,
                &GatewayAttachmentProps {
                    vpc_id: self.vpc_ref(),
                    internet_gateway_id: Value::reference(&self.internet_gateway),
                },
            )?,
        )?;

        for subnet in self.public_subnets.iter().chain(&self.private_subnets) {
            self.emit_subnet(template, subnet)?;
        }
        Ok(())
    }
}

fn subnet_scope(network: &Scope, kind: SubnetKind, zone: u8) -> Scope {
    network.child(format!("{}Subnet{}", kind.as_str(), zone + 1))
}

/// The `index`-th subnet of prefix length `mask` inside the VPC range
pub fn subnet_cidr(index: u32, mask: u8) -> String {
    let base = u32::from(vpc_base());
    let size = 1u32 << (32 - u32::from(mask));
    let network = Ipv4Addr::from(base + index * size);
    format!("{network}/{mask}")
}

fn vpc_base() -> Ipv4Addr {
    VPC_CIDR
        .split('/')
        .next()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or(Ipv4Addr::new(10, 0, 0, 0))
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VpcProps {
    cidr_block: String,
    enable_dns_hostnames: bool,
    enable_dns_support: bool,
    instance_tenancy: &'static str,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetProps {
    vpc_id: Value,
    availability_zone: Value,
    cidr_block: String,
    map_public_ip_on_launch: bool,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteTableProps {
    vpc_id: Value,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AssociationProps {
    route_table_id: Value,
    subnet_id: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteProps {
    route_table_id: Value,
    destination_cidr_block: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nat_gateway_id: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EipProps {
    domain: &'static str,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NatGatewayProps {
    subnet_id: Value,
    allocation_id: Value,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InternetGatewayProps {
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GatewayAttachmentProps {
    vpc_id: Value,
    internet_gateway_id: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(max_azs: u8, subnet_cidr_mask: u8) -> NetworkSegment {
        NetworkSegment::new(
            &Scope::root("Test").child("BookStoreVpc"),
            &NetworkSettings {
                max_azs,
                subnet_cidr_mask,
            },
        )
    }

    #[test]
    fn test_subnet_cidr_carving() {
        assert_eq!(subnet_cidr(0, 24), "10.0.0.0/24");
        assert_eq!(subnet_cidr(3, 24), "10.0.3.0/24");
        assert_eq!(subnet_cidr(1, 20), "10.0.16.0/20");
        assert_eq!(subnet_cidr(5, 28), "10.0.0.80/28");
    }

    #[test]
    fn test_default_layout() {
        let network = segment(2, 24);
        let cidrs: Vec<_> = network
            .public_subnets
            .iter()
            .chain(&network.private_subnets)
            .map(|s| s.cidr.as_str())
            .collect();
        assert_eq!(cidrs, ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]);
        assert!(network.public_subnets.iter().all(|s| s.nat.is_some()));
        assert!(network.private_subnets.iter().all(|s| s.nat.is_none()));
    }

    #[test]
    fn test_private_routes_use_same_zone_nat() {
        let network = segment(3, 24);
        let mut template = Template::new("Test");
        network.emit(&mut template).unwrap();

        for private in &network.private_subnets {
            let nat = network.nat_for_zone(private.zone).unwrap();
            let route = template.resource(&private.default_route).unwrap();
            assert_eq!(
                route.property("NatGatewayId").unwrap(),
                &serde_json::json!({"Ref": nat.gateway.as_str()}),
                "private subnet in zone {} must egress through its own zone's NAT",
                private.zone
            );
            assert!(route.property("GatewayId").is_none());
        }
    }

    #[test]
    fn test_resource_counts() {
        let network = segment(2, 24);
        let mut template = Template::new("Test");
        network.emit(&mut template).unwrap();

        assert_eq!(template.count_of_type(kinds::VPC), 1);
        assert_eq!(template.count_of_type(kinds::SUBNET), 4);
        assert_eq!(template.count_of_type(kinds::NAT_GATEWAY), 2);
        assert_eq!(template.count_of_type(kinds::ROUTE), 4);
        assert_eq!(template.count_of_type(kinds::INTERNET_GATEWAY), 1);
    }
}
