//! Resource optimization: right-sizing recommendations and config reloads.

use async_trait::async_trait;
use tracing::debug;

use super::{services, CheckGroup};
use crate::cluster::ClusterQuery;
use crate::config::{ObjectRef, OptimizationProfile};
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{check_workload, configured_count, resource_exists};
use crate::validation::report::{Outcome, Subsystem};

pub struct OptimizationChecks {
    profile: OptimizationProfile,
}

impl OptimizationChecks {
    #[must_use]
    pub fn new(profile: OptimizationProfile) -> Self {
        Self { profile }
    }
}

async fn service_exists(cluster: &dyn ClusterQuery, display: &str, service: &ObjectRef) -> Outcome {
    match cluster
        .get_custom_resource(&services(), Some(&service.namespace), &service.name)
        .await
    {
        Ok(_) => Outcome::pass(format!("{display} service exists")),
        Err(err) => {
            debug!(service = %service.name, error = %err, "Service lookup failed");
            Outcome::warn(format!("{display} service not found"))
        }
    }
}

#[async_trait]
impl CheckGroup for OptimizationChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::ResourceOptimization
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        let profile = &self.profile;

        rec.section(&profile.title);
        rec.record(check_workload(cluster, &profile.recommender).await);
        rec.record(resource_exists(cluster, &profile.crd).await);
        rec.record(configured_count(cluster, &profile.recommendations).await);
        rec.record(
            service_exists(cluster, &profile.dashboard_display, &profile.dashboard_service).await,
        );

        rec.section(&profile.reloader.name);
        rec.record(check_workload(cluster, &profile.reloader).await);
    }
}
