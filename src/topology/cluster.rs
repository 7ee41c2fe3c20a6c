//! # Compute Cluster
//!
//! Logical grouping for the container workloads. The cluster itself carries
//! no network configuration; the association with the network segment is
//! realized by the service placing its tasks in the segment's subnets.

use super::common::kinds;
use super::network::NetworkSegment;
use super::Declaration;
use crate::template::{LogicalId, Resource, Scope, SynthError, Template, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeCluster {
    pub cluster: LogicalId,
    /// VPC the cluster's workloads run in
    pub vpc: LogicalId,
}

impl ComputeCluster {
    pub fn new(scope: &Scope, network: &NetworkSegment) -> Self {
        Self {
            cluster: scope.logical_id(),
            vpc: network.vpc.clone(),
        }
    }

    pub fn cluster_ref(&self) -> Value {
        Value::reference(&self.cluster)
    }
}

impl Declaration for ComputeCluster {
    fn emit(&self, template: &mut Template) -> Result<(), SynthError> {
        template.add(
            self.cluster.clone(),
            Resource::new(&self.cluster, kinds::ECS_CLUSTER, &serde_json::Map::new())?,
        )
    }
}
