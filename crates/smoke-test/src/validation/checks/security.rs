//! Security configuration: secret sync, admission policies, certificates.

use async_trait::async_trait;
use tracing::debug;

use super::CheckGroup;
use crate::cluster::{ClusterQuery, StructuredResource};
use crate::config::SecurityProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{
    check_workload, condition_satisfied, configured_count, count_where, get_versioned,
    list_versioned, status_flag, VersionedFetch,
};
use crate::validation::report::{Outcome, Subsystem};

pub struct SecurityChecks {
    profile: SecurityProfile,
}

impl SecurityChecks {
    #[must_use]
    pub fn new(profile: SecurityProfile) -> Self {
        Self { profile }
    }

    async fn secret_store(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let spec = &self.profile.secret_store;
        let label = format!(
            "{} '{}'",
            spec.display,
            spec.name.as_deref().unwrap_or_default()
        );
        Outcome::require(get_versioned(cluster, spec).await.is_found(), label)
    }

    async fn external_secrets(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let spec = &self.profile.external_secrets;
        match list_versioned(cluster, spec).await {
            VersionedFetch::Found { data, .. } if data.is_empty() => {
                Outcome::pass(format!("No {} configured (OK)", spec.display))
            }
            VersionedFetch::Found { data, .. } => {
                let synced = count_where(&data, |es| condition_satisfied(es, "Ready"));
                let label = format!("{} synced: {synced}/{}", spec.display, data.len());
                if synced == data.len() {
                    Outcome::pass(label)
                } else {
                    Outcome::warn(label)
                }
            }
            VersionedFetch::Exhausted { last_error } => {
                debug!(error = ?last_error, "ExternalSecrets not listable");
                Outcome::warn(format!("Could not list {}", spec.display))
            }
        }
    }

    async fn policies(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let spec = &self.profile.policies;
        match list_versioned(cluster, spec).await.data() {
            Some(items) => Outcome::pass(format!(
                "{}: {} total, {} ready",
                spec.display,
                items.len(),
                count_where(&items, policy_ready)
            )),
            None => Outcome::warn(format!("Could not list {}", spec.display)),
        }
    }

    /// `None` when there is nothing to report.
    async fn certificates(&self, cluster: &dyn ClusterQuery) -> Option<Outcome> {
        let spec = &self.profile.certificates;
        match list_versioned(cluster, spec).await.data() {
            Some(items) if items.is_empty() => None,
            Some(items) => Some(Outcome::pass(format!(
                "{}: {} total, {} ready",
                spec.display,
                items.len(),
                count_where(&items, |cert| condition_satisfied(cert, "Ready"))
            ))),
            None => Some(Outcome::warn(format!("Could not list {}", spec.display))),
        }
    }
}

/// Policies report readiness either as `status.ready` or a `Ready` condition.
fn policy_ready(policy: &StructuredResource) -> bool {
    status_flag(policy, &["status", "ready"]) || condition_satisfied(policy, "Ready")
}

#[async_trait]
impl CheckGroup for SecurityChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Security
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        rec.section("Secrets Management");
        rec.record(self.secret_store(cluster).await);
        rec.record(self.external_secrets(cluster).await);

        rec.section(&self.profile.policies_title);
        rec.record(self.policies(cluster).await);

        rec.section("TLS/Certificates");
        rec.record(check_workload(cluster, &self.profile.cert_manager).await);
        rec.record(configured_count(cluster, &self.profile.issuers).await);
        rec.record(self.certificates(cluster).await);
    }
}
