//! Backup and recovery.

use async_trait::async_trait;
use tracing::debug;

use super::{credential_binding, CheckGroup};
use crate::cluster::ClusterQuery;
use crate::config::BackupProfile;
use crate::validation::aggregator::GroupRecorder;
use crate::validation::probes::{
    check_workload, configured_count, count_where, list_versioned, status_field_equals,
    VersionedFetch,
};
use crate::validation::report::{Outcome, Subsystem};

pub struct BackupChecks {
    profile: BackupProfile,
    credential_annotation: String,
}

impl BackupChecks {
    #[must_use]
    pub fn new(profile: BackupProfile, credential_annotation: String) -> Self {
        Self {
            profile,
            credential_annotation,
        }
    }

    async fn storage_locations(&self, cluster: &dyn ClusterQuery) -> Outcome {
        let spec = &self.profile.storage_locations;
        match list_versioned(cluster, spec).await.data() {
            Some(items) if !items.is_empty() => Outcome::pass(format!(
                "{}: {} total, {} available",
                spec.display,
                items.len(),
                count_where(&items, |bsl| {
                    status_field_equals(bsl, &["status", "phase"], "Available")
                })
            )),
            _ => Outcome::warn(format!("No {} configured", spec.display)),
        }
    }

    /// Backup history. An empty history reports nothing.
    async fn backups(&self, cluster: &dyn ClusterQuery) -> Option<Outcome> {
        let spec = &self.profile.backups;
        match list_versioned(cluster, spec).await {
            VersionedFetch::Found { data, .. } if data.is_empty() => None,
            VersionedFetch::Found { data, .. } => Some(Outcome::pass(format!(
                "{}: {} total, {} completed",
                spec.display,
                data.len(),
                count_where(&data, |backup| {
                    status_field_equals(backup, &["status", "phase"], "Completed")
                })
            ))),
            VersionedFetch::Exhausted { last_error } => {
                debug!(error = ?last_error, "Backups not listable");
                Some(Outcome::warn(format!("Could not list {}", spec.display)))
            }
        }
    }
}

#[async_trait]
impl CheckGroup for BackupChecks {
    fn subsystem(&self) -> Subsystem {
        Subsystem::BackupRecovery
    }

    async fn run(&self, cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
        let profile = &self.profile;

        rec.section(&profile.title);
        rec.record(check_workload(cluster, &profile.agent).await);
        rec.record(
            credential_binding(
                cluster,
                &profile.service_account,
                &self.credential_annotation,
                &profile.title,
            )
            .await,
        );
        rec.record(self.storage_locations(cluster).await);
        rec.record(configured_count(cluster, &profile.schedules).await);
        rec.record(self.backups(cluster).await);
    }
}
