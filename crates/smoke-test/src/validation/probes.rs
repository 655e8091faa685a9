//! Resource probes.
//!
//! Each probe turns one or more [`ClusterQuery`] calls into a classified
//! result. Probes never retry and never return errors: a failed call becomes
//! an [`Outcome`] (or "not satisfied" for status inspection) right here.

use std::future::Future;

use serde_json::Value;
use tracing::debug;

use super::report::Outcome;
use crate::cluster::{ClusterQuery, GroupVersionResource, QueryError, StructuredResource};
use crate::config::{CrdTarget, VersionedResourceSpec, WorkloadTarget};

/// What the readiness probe saw for one selector.
///
/// `matched` and `running` are kept apart so callers can tell an empty
/// selector from unhealthy pods, even though [`Self::to_outcome`] reports
/// both as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadReadiness {
    Observed { matched: usize, running: usize },
    ListError(QueryError),
}

impl WorkloadReadiness {
    #[must_use]
    pub fn running(&self) -> usize {
        match self {
            Self::Observed { running, .. } => *running,
            Self::ListError(_) => 0,
        }
    }

    /// Classify for `target`. Optional targets downgrade failure to a warning.
    #[must_use]
    pub fn to_outcome(&self, target: &WorkloadTarget) -> Outcome {
        let outcome = match self {
            Self::ListError(_) => Outcome::fail(format!("{} (error listing)", target.name)),
            Self::Observed { running, .. } if *running > 0 => {
                Outcome::pass(format!("{}: {running} running", target.name))
            }
            Self::Observed { matched: 0, .. } => Outcome::fail(format!(
                "{}: no pods running (selector matched nothing)",
                target.name
            )),
            Self::Observed { .. } => Outcome::fail(format!("{}: no pods running", target.name)),
        };

        if target.required {
            outcome
        } else {
            outcome.downgraded()
        }
    }

    /// Like [`Self::to_outcome`], but a target that is only reported when
    /// running yields nothing unless at least one pod runs.
    #[must_use]
    pub fn classify(&self, target: &WorkloadTarget) -> Option<Outcome> {
        if target.silent_when_absent && self.running() == 0 {
            debug!(workload = %target.name, "Not running, skipped");
            return None;
        }
        Some(self.to_outcome(target))
    }
}

/// Count pods matching the target selector and how many are `Running`.
pub async fn workload_readiness(
    cluster: &dyn ClusterQuery,
    target: &WorkloadTarget,
) -> WorkloadReadiness {
    match cluster.list_by_label(&target.namespace, &target.selector).await {
        Ok(pods) => WorkloadReadiness::Observed {
            matched: pods.len(),
            running: pods.iter().filter(|p| p.is_running()).count(),
        },
        Err(err) => {
            debug!(workload = %target.name, error = %err, "Failed to list pods");
            WorkloadReadiness::ListError(err)
        }
    }
}

/// Readiness probe plus classification.
pub async fn check_workload(
    cluster: &dyn ClusterQuery,
    target: &WorkloadTarget,
) -> Option<Outcome> {
    workload_readiness(cluster, target).await.classify(target)
}

/// Existence is binary: present passes, anything else fails.
pub async fn resource_exists(cluster: &dyn ClusterQuery, crd: &CrdTarget) -> Outcome {
    let found = match cluster.custom_resource_definition_exists(&crd.name).await {
        Ok(found) => found,
        Err(err) => {
            debug!(crd = %crd.name, error = %err, "Failed to look up CRD");
            false
        }
    };
    Outcome::require(found, crd.display.as_str())
}

/// Result of walking a resource's candidate versions.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedFetch<T> {
    Found { version: String, data: T },
    Exhausted { last_error: Option<QueryError> },
}

impl<T> VersionedFetch<T> {
    /// The data, or `None` when every version failed.
    pub fn data(self) -> Option<T> {
        match self {
            Self::Found { data, .. } => Some(data),
            Self::Exhausted { .. } => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Position in the version candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionCursor {
    Trying(usize),
    Exhausted,
}

impl VersionCursor {
    fn start(candidates: usize) -> Self {
        if candidates == 0 {
            Self::Exhausted
        } else {
            Self::Trying(0)
        }
    }

    /// Move past a failed candidate.
    fn advance(self, candidates: usize) -> Self {
        match self {
            Self::Trying(i) if i + 1 < candidates => Self::Trying(i + 1),
            _ => Self::Exhausted,
        }
    }
}

/// Try `attempt` against each version in order, stopping at the first success.
async fn walk_versions<T, F, Fut>(spec: &VersionedResourceSpec, mut attempt: F) -> VersionedFetch<T>
where
    F: FnMut(GroupVersionResource) -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
{
    let mut cursor = VersionCursor::start(spec.versions.len());
    let mut last_error = None;

    while let VersionCursor::Trying(i) = cursor {
        let version = &spec.versions[i];
        match attempt(spec.gvr(version)).await {
            Ok(data) => {
                return VersionedFetch::Found {
                    version: version.clone(),
                    data,
                };
            }
            Err(err) => {
                debug!(
                    resource = %spec.display,
                    version = %version,
                    error = %err,
                    "API version unavailable, trying next candidate"
                );
                last_error = Some(err);
                cursor = cursor.advance(spec.versions.len());
            }
        }
    }

    VersionedFetch::Exhausted { last_error }
}

/// List a versioned resource, falling back through its candidate versions.
pub async fn list_versioned(
    cluster: &dyn ClusterQuery,
    spec: &VersionedResourceSpec,
) -> VersionedFetch<Vec<StructuredResource>> {
    let namespace = spec.namespace.as_deref();
    walk_versions(spec, move |gvr| async move {
        cluster.list_custom_resources(&gvr, namespace).await
    })
    .await
}

/// Fetch a resource's named object, falling back through its candidate versions.
///
/// A resource without a name is exhausted immediately.
pub async fn get_versioned(
    cluster: &dyn ClusterQuery,
    spec: &VersionedResourceSpec,
) -> VersionedFetch<StructuredResource> {
    let Some(name) = spec.name.as_deref() else {
        return VersionedFetch::Exhausted {
            last_error: Some(QueryError::NotFound(format!(
                "{} has no object name",
                spec.display
            ))),
        };
    };
    let namespace = spec.namespace.as_deref();
    walk_versions(spec, move |gvr| async move {
        cluster.get_custom_resource(&gvr, namespace, name).await
    })
    .await
}

/// Whether the first `status.conditions` entry of `condition_type` has status `"True"`.
///
/// Missing or malformed status counts as not satisfied.
#[must_use]
pub fn condition_satisfied(resource: &StructuredResource, condition_type: &str) -> bool {
    match resource.seq_field(&["status", "conditions"]) {
        Ok(conditions) => conditions
            .iter()
            .find(|c| c.get("type").and_then(Value::as_str) == Some(condition_type))
            .is_some_and(|c| c.get("status").and_then(Value::as_str) == Some("True")),
        Err(err) => {
            debug!(resource = ?resource.name(), error = %err, "No conditions to inspect");
            false
        }
    }
}

/// Whether a string field at `path` equals `expected`.
#[must_use]
pub fn status_field_equals(resource: &StructuredResource, path: &[&str], expected: &str) -> bool {
    match resource.str_field(path) {
        Ok(value) => value == expected,
        Err(err) => {
            debug!(resource = ?resource.name(), error = %err, "Status field unavailable");
            false
        }
    }
}

/// Whether a boolean field at `path` is `true`.
#[must_use]
pub fn status_flag(resource: &StructuredResource, path: &[&str]) -> bool {
    match resource.bool_field(path) {
        Ok(value) => value,
        Err(err) => {
            debug!(resource = ?resource.name(), error = %err, "Status flag unavailable");
            false
        }
    }
}

/// Whether `metadata.annotations[key]` is present and non-empty.
#[must_use]
pub fn has_annotation(resource: &StructuredResource, key: &str) -> bool {
    resource
        .str_field(&["metadata", "annotations", key])
        .is_ok_and(|value| !value.is_empty())
}

/// Count items satisfying `predicate`.
pub fn count_where<F>(items: &[StructuredResource], predicate: F) -> usize
where
    F: Fn(&StructuredResource) -> bool,
{
    items.iter().filter(|item| predicate(item)).count()
}

/// Pass with the count when at least one object is configured, warn otherwise.
///
/// Absence is not necessarily unhealthy, so an empty or unlistable
/// collection is a warning.
pub async fn configured_count(cluster: &dyn ClusterQuery, spec: &VersionedResourceSpec) -> Outcome {
    match list_versioned(cluster, spec).await.data() {
        Some(items) if !items.is_empty() => Outcome::pass(spec.present_label(items.len())),
        _ => Outcome::warn(spec.empty_label()),
    }
}
