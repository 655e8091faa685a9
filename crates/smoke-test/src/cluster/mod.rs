//! Read-only access to the control-plane API.
//!
//! Every probe talks to the cluster through [`ClusterQuery`]. Two
//! implementations ship with the crate:
//! - [`KubeCluster`] queries a live API server through kube-rs
//! - [`SnapshotCluster`] answers from a captured [`ClusterSnapshot`]

pub mod client;
pub mod fields;
pub mod snapshot;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::client::KubeCluster;
pub use self::fields::{FieldError, StructuredResource};
pub use self::snapshot::{ClusterSnapshot, SnapshotCluster};

/// Errors surfaced by a [`ClusterQuery`] call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// API server unreachable, or the request was rejected for auth reasons.
    #[error("connection error: {0}")]
    Connection(String),

    /// The resource type or the named object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl QueryError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Identity of a resource collection on the API server.
///
/// Core objects (nodes, services, service accounts) use an empty group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    #[must_use]
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Core (`v1`) API resource such as `nodes` or `services`.
    #[must_use]
    pub fn core(resource: &str) -> Self {
        Self::new("", "v1", resource)
    }

    /// The `apiVersion` string, `v1` for core and `group/version` otherwise.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.resource)
    }
}

/// The slice of a pod the readiness probe needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub name: String,
    pub phase: Option<String>,
}

impl WorkloadStatus {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some("Running")
    }
}

/// Narrow, read-only view of the control-plane API.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Git version reported by the API server.
    async fn server_version(&self) -> Result<String, QueryError>;

    /// Pods in `namespace` matching `selector`. An empty selector matches every pod.
    async fn list_by_label(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<WorkloadStatus>, QueryError>;

    /// Whether a `CustomResourceDefinition` with this name is registered.
    async fn custom_resource_definition_exists(&self, name: &str) -> Result<bool, QueryError>;

    /// List objects of a resource type, cluster-wide when `namespace` is `None`.
    async fn list_custom_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> Result<Vec<StructuredResource>, QueryError>;

    /// Fetch one named object.
    async fn get_custom_resource(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<StructuredResource, QueryError>;

    /// Whether the API server serves `group_version` (e.g. `metrics.k8s.io/v1beta1`).
    async fn api_version_served(&self, group_version: &str) -> Result<bool, QueryError>;
}
