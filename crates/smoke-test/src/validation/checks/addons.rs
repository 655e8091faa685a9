//! Core add-ons: registered CRDs and add-on controllers.

use async_trait::async_trait;

use super::CheckGroup;
use crate::cluster::ClusterQuery;
use crate::config::AddonsProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{check_workload, resource_exists};
use crate::validation::report::Subsystem;

pub struct CoreAddonChecks {
    profile: AddonsProfile,
}

impl CoreAddonChecks {
    #[must_use]
    pub fn new(profile: AddonsProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl CheckGroup for CoreAddonChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::CoreAddons
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        rec.section("CRDs Installed");
        for crd in &self.profile.crds {
            rec.record(resource_exists(cluster, crd).await);
        }

        rec.section("Addon Deployments");
        for target in &self.profile.workloads {
            rec.record(check_workload(cluster, target).await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterSnapshot, SnapshotCluster};
    use crate::config::Profile;
    use crate::validation::aggregator::ResultAggregator;
    use crate::validation::report::{RecordedOutcome, Severity};

    async fn run(snapshot: ClusterSnapshot) -> Vec<RecordedOutcome> {
        let group = CoreAddonChecks::new(Profile::builtin().unwrap().addons);
        let aggregator = ResultAggregator::new();
        let mut rec = GroupRecorder::new(&aggregator, group.subsystem());
        group.run(&SnapshotCluster::new(snapshot), &mut rec).await;
        aggregator.into_report().outcomes
    }

    #[tokio::test]
    async fn test_one_outcome_per_crd_and_workload() {
        let outcomes = run(ClusterSnapshot::default()).await;
        assert_eq!(outcomes.len(), 22);
        assert!(outcomes[..11].iter().all(|o| o.section == "CRDs Installed"));
        assert!(outcomes[11..].iter().all(|o| o.section == "Addon Deployments"));
        assert!(outcomes.iter().all(|o| o.outcome.severity == Severity::Fail));
    }

    #[tokio::test]
    async fn test_installed_addons_pass() {
        let snapshot = ClusterSnapshot::default()
            .with_crd("backups.velero.io")
            .with_pod("reloader", "reloader-0", "app.kubernetes.io/name=reloader", "Running");
        let outcomes = run(snapshot).await;

        let velero = outcomes
            .iter()
            .find(|o| o.outcome.label == "Velero Backups")
            .unwrap();
        assert_eq!(velero.outcome.severity, Severity::Pass);
        let reloader = outcomes
            .iter()
            .find(|o| o.outcome.label.starts_with("Reloader"))
            .unwrap();
        assert_eq!(reloader.outcome.label, "Reloader: 1 running");
    }
}
