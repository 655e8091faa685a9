//! Check groups.
//!
//! A group is an ordered list of probe invocations for one subsystem,
//! plus whatever post-processing turns listed objects into a verdict
//! (ready/total ratios and the like). Groups never look at each other's
//! outcomes, so they can run in any order or concurrently.

pub mod addons;
pub mod backup;
pub mod cluster;
pub mod networking;
pub mod observability;
pub mod optimization;
pub mod security;

use async_trait::async_trait;
use tracing::debug;

use super::aggregator::GroupRecorder;
use super::probes::has_annotation;
use super::report::{Outcome, Subsystem};
use crate::cluster::{ClusterQuery, GroupVersionResource};
use crate::config::{ObjectRef, Profile};

pub use addons::CoreAddonChecks;
pub use backup::BackupChecks;
pub use cluster::ClusterHealthChecks;
pub use networking::NetworkingChecks;
pub use observability::ObservabilityChecks;
pub use optimization::OptimizationChecks;
pub use security::SecurityChecks;

/// One subsystem's checks.
#[async_trait]
pub trait CheckGroup: Send + Sync {
    fn subsystem(&self) -> Subsystem;

    /// Run every check, emitting outcomes through `recorder`.
    async fn run(&self, cluster: &dyn ClusterQuery, recorder: &mut GroupRecorder<'_>);
}

/// The seven standard groups, in report order.
#[must_use]
pub fn standard_groups(profile: &Profile) -> Vec<Box<dyn CheckGroup>> {
    vec![
        Box::new(ClusterHealthChecks::new(profile.cluster.clone())),
        Box::new(CoreAddonChecks::new(profile.addons.clone())),
        Box::new(SecurityChecks::new(profile.security.clone())),
        Box::new(NetworkingChecks::new(
            profile.networking.clone(),
            profile.credential_annotation.clone(),
        )),
        Box::new(BackupChecks::new(
            profile.backup.clone(),
            profile.credential_annotation.clone(),
        )),
        Box::new(OptimizationChecks::new(profile.optimization.clone())),
        Box::new(ObservabilityChecks::new(profile.observability.clone())),
    ]
}

pub(crate) fn nodes() -> GroupVersionResource {
    GroupVersionResource::core("nodes")
}

pub(crate) fn services() -> GroupVersionResource {
    GroupVersionResource::core("services")
}

pub(crate) fn service_accounts() -> GroupVersionResource {
    GroupVersionResource::core("serviceaccounts")
}

pub(crate) fn ingresses() -> GroupVersionResource {
    GroupVersionResource::new("networking.k8s.io", "v1", "ingresses")
}

pub(crate) fn ingress_classes() -> GroupVersionResource {
    GroupVersionResource::new("networking.k8s.io", "v1", "ingressclasses")
}

/// Check that a service account carries a non-empty cloud role annotation.
///
/// A missing annotation or an unreadable service account is a warning:
/// the workload may still run on node credentials.
pub(crate) async fn credential_binding(
    cluster: &dyn ClusterQuery,
    account: &ObjectRef,
    annotation: &str,
    subject: &str,
) -> Outcome {
    match cluster
        .get_custom_resource(&service_accounts(), Some(&account.namespace), &account.name)
        .await
    {
        Ok(sa) if has_annotation(&sa, annotation) => {
            Outcome::pass(format!("{subject} has IRSA configured"))
        }
        Ok(_) => Outcome::warn(format!("{subject} missing IRSA annotation")),
        Err(err) => {
            debug!(
                namespace = %account.namespace,
                name = %account.name,
                error = %err,
                "Failed to read service account"
            );
            Outcome::warn(format!(
                "{subject} service account {}/{} not readable",
                account.namespace, account.name
            ))
        }
    }
}
