//! Observability: metrics pipeline, log agents, monitoring stack.

use async_trait::async_trait;
use tracing::debug;

use super::{ingresses, CheckGroup};
use crate::cluster::{ClusterQuery, StructuredResource};
use crate::config::ObservabilityProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{check_workload, list_versioned};
use crate::validation::report::{Outcome, Subsystem};

pub struct ObservabilityChecks {
    profile: ObservabilityProfile,
}

impl ObservabilityChecks {
    #[must_use]
    pub fn new(profile: ObservabilityProfile) -> Self {
        Self { profile }
    }

    async fn metrics_api(&self, cluster: &dyn ClusterQuery) -> Outcome {
        match cluster.api_version_served(&self.profile.metrics_api).await {
            Ok(true) => Outcome::pass("Metrics API available"),
            Ok(false) => Outcome::warn("Metrics API not available"),
            Err(err) => {
                debug!(error = %err, "API discovery failed");
                Outcome::warn("Metrics API not available")
            }
        }
    }

    async fn node_metrics(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let spec = &self.profile.node_metrics;
        match list_versioned(cluster, spec).await.data() {
            Some(items) if !items.is_empty() => {
                Outcome::pass(format!("{} available: {} nodes", spec.display, items.len()))
            }
            _ => Outcome::warn(format!("{} not available", spec.display)),
        }
    }

    /// Every pod in the monitoring namespace, regardless of labels.
    async fn monitoring_namespace(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let profile = &self.profile;
        let namespace = &profile.monitoring_namespace;
        match cluster.list_by_label(namespace, "").await {
            Ok(pods) if pods.is_empty() => Outcome::warn("Monitoring namespace/pods not found"),
            Ok(pods) => match pods.iter().filter(|p| p.is_running()).count() {
                0 => Outcome::warn("Monitoring pods: none running"),
                running => Outcome::pass(format!("Monitoring namespace pods: {running} running")),
            },
            Err(err) => {
                debug!(namespace = %namespace, error = %err, "Failed to list monitoring pods");
                Outcome::warn("Monitoring namespace/pods not found")
            }
        }
    }

    async fn dashboard_ingresses(&self, cluster: &dyn ClusterQuery) -> Vec<Outcome> {
        let namespace = &self.profile.monitoring_namespace;
        match cluster
            .list_custom_resources(&ingresses(), Some(namespace))
            .await
        {
            Ok(items) => items
                .iter()
                .filter_map(first_rule_host)
                .map(|host| Outcome::pass(format!("{} ingress: {host}", self.profile.dashboard_display)))
                .collect(),
            Err(err) => {
                debug!(namespace = %namespace, error = %err, "Failed to list ingresses");
                vec![Outcome::warn("Could not list dashboard ingresses")]
            }
        }
    }
}

fn first_rule_host(ingress: &StructuredResource) -> Option<&str> {
    ingress
        .seq_field(&["spec", "rules"])
        .ok()?
        .first()?
        .get("host")?
        .as_str()
        .filter(|host| !host.is_empty())
}

#[async_trait]
impl CheckGroup for ObservabilityChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Observability
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        let profile = &self.profile;

        rec.section("Metrics Server");
        rec.record(check_workload(cluster, &profile.metrics_server).await);
        rec.record(self.metrics_api(cluster).await);
        rec.record(self.node_metrics(cluster).await);

        rec.section(&profile.agents_title);
        for target in &profile.agents {
            rec.record(check_workload(cluster, target).await);
        }

        rec.section(&profile.monitoring_title);
        for target in &profile.collectors {
            rec.record(check_workload(cluster, target).await);
        }
        rec.record(self.monitoring_namespace(cluster).await);
        for outcome in self.dashboard_ingresses(cluster).await {
            rec.record(outcome);
        }
    }
}
