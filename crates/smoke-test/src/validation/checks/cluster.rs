//! Cluster health: connectivity, nodes, system pods, autoscaler.

use async_trait::async_trait;
use tracing::debug;

use super::{nodes, CheckGroup};
use crate::cluster::{ClusterQuery, StructuredResource};
use crate::config::ClusterHealthProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{
    check_workload, condition_satisfied, configured_count, resource_exists,
};
use crate::validation::report::Subsystem;

pub struct ClusterHealthChecks {
    profile: ClusterHealthProfile,
}

impl ClusterHealthChecks {
    #[must_use]
    pub fn new(profile: ClusterHealthProfile) -> Self {
        Self { profile }
    }
}

/// `(ready, not_ready)` by each node's `Ready` condition.
fn node_readiness(items: &[StructuredResource]) -> (usize, usize) {
    let ready = items
        .iter()
        .filter(|node| condition_satisfied(node, "Ready"))
        .count();
    (ready, items.len() - ready)
}

#[async_trait]
impl CheckGroup for ClusterHealthChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::ClusterHealth
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        rec.section("Cluster Connectivity");
        match cluster.server_version().await {
            Ok(version) => rec.pass(format!("Cluster connectivity (Kubernetes {version})")),
            Err(err) => {
                debug!(error = %err, "API server unreachable");
                rec.fail("Cluster connectivity");
            }
        }

        rec.section("Node Health");
        match cluster.list_custom_resources(&nodes(), None).await {
            Ok(items) => {
                let (ready, not_ready) = node_readiness(&items);
                rec.pass(format!("Nodes ready: {ready}"));
                if not_ready > 0 {
                    rec.warn(format!("Nodes not ready: {not_ready}"));
                }
            }
            Err(err) => {
                debug!(error = %err, "Failed to list nodes");
                rec.fail("List nodes");
            }
        }

        rec.section("System Pods");
        for target in &self.profile.system_workloads {
            rec.record(check_workload(cluster, target).await);
        }

        let autoscaler = &self.profile.autoscaler;
        rec.section(&autoscaler.title);
        rec.record(check_workload(cluster, &autoscaler.controller).await);
        for crd in &autoscaler.crds {
            rec.record(resource_exists(cluster, crd).await);
        }
        for spec in &autoscaler.resources {
            rec.record(configured_count(cluster, spec).await);
        }

        for target in &self.profile.node_lifecycle {
            rec.section(&target.name);
            rec.record(check_workload(cluster, target).await);
        }
    }
}
