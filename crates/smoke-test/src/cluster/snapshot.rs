//! Offline [`ClusterQuery`] over a captured cluster state.
//!
//! A snapshot is a YAML (or JSON) document listing pods, registered CRDs,
//! served API versions and raw objects per resource collection. It lets an
//! audit run against a saved state and gives the test suite a deterministic
//! cluster.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::core::{Expression, Selector, SelectorExt};
use serde::{Deserialize, Serialize};

use super::{ClusterQuery, GroupVersionResource, QueryError, StructuredResource, WorkloadStatus};

/// A pod as recorded in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodRecord {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub phase: Option<String>,
}

/// All objects of one resource collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCollection {
    #[serde(flatten)]
    pub gvr: GroupVersionResource,
    #[serde(default)]
    pub items: Vec<StructuredResource>,
}

/// Serializable cluster state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterSnapshot {
    /// Reported server version; `None` reports `unknown`.
    pub server_version: Option<String>,
    /// When set, every query fails with a connection error.
    pub unreachable: bool,
    pub pods: Vec<PodRecord>,
    pub crds: BTreeSet<String>,
    pub api_versions: BTreeSet<String>,
    pub resources: Vec<ResourceCollection>,
}

impl ClusterSnapshot {
    /// Load a snapshot from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    #[must_use]
    pub fn with_server_version(mut self, version: &str) -> Self {
        self.server_version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Add a pod. `selector_labels` uses selector syntax: `k=v,k2=v2`.
    #[must_use]
    pub fn with_pod(
        mut self,
        namespace: &str,
        name: &str,
        selector_labels: &str,
        phase: &str,
    ) -> Self {
        let labels = selector_labels
            .split(',')
            .filter_map(|term| term.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        self.pods.push(PodRecord {
            namespace: namespace.to_string(),
            name: name.to_string(),
            labels,
            phase: Some(phase.to_string()),
        });
        self
    }

    #[must_use]
    pub fn with_crd(mut self, name: &str) -> Self {
        self.crds.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, group_version: &str) -> Self {
        self.api_versions.insert(group_version.to_string());
        self
    }

    /// Register a collection. Repeated calls for the same collection append items.
    #[must_use]
    pub fn with_resources(
        mut self,
        gvr: GroupVersionResource,
        items: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        let items = items.into_iter().map(StructuredResource::new);
        if let Some(existing) = self.resources.iter_mut().find(|c| c.gvr == gvr) {
            existing.items.extend(items);
        } else {
            self.resources.push(ResourceCollection {
                gvr,
                items: items.collect(),
            });
        }
        self
    }

    fn collection(&self, gvr: &GroupVersionResource) -> Option<&ResourceCollection> {
        self.resources.iter().find(|c| &c.gvr == gvr)
    }
}

/// Parse one equality or existence term (`k=v`, `k==v`, `k!=v`, `k`, `!k`).
fn parse_term(term: &str) -> Option<Expression> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    if let Some((key, value)) = term.split_once("!=") {
        return Some(Expression::NotEqual(key.trim().into(), value.trim().into()));
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        return Some(Expression::Equal(key.trim().into(), value.trim().into()));
    }
    if let Some(key) = term.strip_prefix('!') {
        return Some(Expression::DoesNotExist(key.trim().into()));
    }
    Some(Expression::Exists(term.into()))
}

/// Parse a comma-separated label selector. An empty string selects everything.
fn parse_selector(selector: &str) -> Selector {
    selector.split(',').filter_map(parse_term).collect()
}

/// [`ClusterQuery`] answering from a [`ClusterSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotCluster {
    snapshot: ClusterSnapshot,
}

impl SnapshotCluster {
    #[must_use]
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self { snapshot }
    }

    fn reachable(&self) -> Result<(), QueryError> {
        if self.snapshot.unreachable {
            Err(QueryError::Connection(
                "snapshot marks the cluster unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClusterQuery for SnapshotCluster {
    async fn server_version(&self) -> Result<String, QueryError> {
        self.reachable()?;
        Ok(self
            .snapshot
            .server_version
            .clone()
            .unwrap_or_else(|| "unknown".to_string()))
    }

    async fn list_by_label(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<WorkloadStatus>, QueryError> {
        self.reachable()?;
        let selector = parse_selector(selector);
        Ok(self
            .snapshot
            .pods
            .iter()
            .filter(|p| p.namespace == namespace && selector.matches(&p.labels))
            .map(|p| WorkloadStatus {
                name: p.name.clone(),
                phase: p.phase.clone(),
            })
            .collect())
    }

    async fn custom_resource_definition_exists(&self, name: &str) -> Result<bool, QueryError> {
        self.reachable()?;
        Ok(self.snapshot.crds.contains(name))
    }

    async fn list_custom_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> Result<Vec<StructuredResource>, QueryError> {
        self.reachable()?;
        let collection = self
            .snapshot
            .collection(gvr)
            .ok_or_else(|| QueryError::NotFound(format!("{gvr} is not served")))?;

        Ok(collection
            .items
            .iter()
            .filter(|item| namespace.is_none() || item.namespace() == namespace)
            .cloned()
            .collect())
    }

    async fn get_custom_resource(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<StructuredResource, QueryError> {
        self.list_custom_resources(gvr, namespace)
            .await?
            .into_iter()
            .find(|item| item.name() == Some(name))
            .ok_or_else(|| QueryError::NotFound(format!("{gvr} {name}")))
    }

    async fn api_version_served(&self, group_version: &str) -> Result<bool, QueryError> {
        self.reachable()?;
        Ok(self.snapshot.api_versions.contains(group_version)
            || self
                .snapshot
                .resources
                .iter()
                .any(|c| c.gvr.api_version() == group_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_selector_terms() {
        let pod = labels(&[("app.kubernetes.io/name", "velero"), ("tier", "backup")]);
        let matches = |selector: &str| parse_selector(selector).matches(&pod);
        assert!(matches(""));
        assert!(parse_selector(" , ").selects_all());
        assert!(matches("app.kubernetes.io/name=velero"));
        assert!(matches("app.kubernetes.io/name==velero,tier"));
        assert!(matches("tier!=web,!canary"));
        assert!(!matches("app.kubernetes.io/name=reloader"));
        assert!(!matches("tier,canary"));
        assert!(!matches("!tier"));
    }

    #[test]
    fn test_selector_terms_map_to_expressions() {
        assert_eq!(
            parse_term("tier != web"),
            Some(Expression::NotEqual("tier".into(), "web".into()))
        );
        assert_eq!(
            parse_term("k8s-app=kube-dns"),
            Some(Expression::Equal("k8s-app".into(), "kube-dns".into()))
        );
        assert_eq!(parse_term("!canary"), Some(Expression::DoesNotExist("canary".into())));
        assert_eq!(parse_term("  "), None);
    }

    #[tokio::test]
    async fn test_pods_filtered_by_namespace_and_selector() {
        let cluster = SnapshotCluster::new(
            ClusterSnapshot::default()
                .with_pod("kube-system", "coredns-a", "k8s-app=kube-dns", "Running")
                .with_pod("kube-system", "coredns-b", "k8s-app=kube-dns", "Pending")
                .with_pod("kube-system", "kube-proxy-a", "k8s-app=kube-proxy", "Running")
                .with_pod("dns", "coredns-x", "k8s-app=kube-dns", "Running"),
        );

        let pods = cluster
            .list_by_label("kube-system", "k8s-app=kube-dns")
            .await
            .unwrap();
        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0].name, "coredns-a");

        let all = cluster.list_by_label("kube-system", "").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_unregistered_collection_is_not_found() {
        let cluster = SnapshotCluster::default();
        let err = cluster
            .list_custom_resources(
                &GroupVersionResource::new("karpenter.sh", "v1", "nodepools"),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_namespaced_list_and_get() {
        let schedules = GroupVersionResource::new("velero.io", "v1", "schedules");
        let cluster = SnapshotCluster::new(ClusterSnapshot::default().with_resources(
            schedules.clone(),
            vec![
                json!({"metadata": {"name": "daily", "namespace": "velero"}}),
                json!({"metadata": {"name": "stray", "namespace": "default"}}),
            ],
        ));

        let in_velero = cluster
            .list_custom_resources(&schedules, Some("velero"))
            .await
            .unwrap();
        assert_eq!(in_velero.len(), 1);

        let everywhere = cluster.list_custom_resources(&schedules, None).await.unwrap();
        assert_eq!(everywhere.len(), 2);

        let daily = cluster
            .get_custom_resource(&schedules, Some("velero"), "daily")
            .await
            .unwrap();
        assert_eq!(daily.name(), Some("daily"));

        let missing = cluster
            .get_custom_resource(&schedules, Some("velero"), "weekly")
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_unreachable_fails_every_call() {
        let cluster = SnapshotCluster::new(ClusterSnapshot::default().unreachable());
        assert!(matches!(
            cluster.server_version().await,
            Err(QueryError::Connection(_))
        ));
        assert!(matches!(
            cluster.list_by_label("kube-system", "").await,
            Err(QueryError::Connection(_))
        ));
        assert!(matches!(
            cluster.custom_resource_definition_exists("x").await,
            Err(QueryError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_api_version_served_from_collections() {
        let cluster = SnapshotCluster::new(
            ClusterSnapshot::default()
                .with_api_version("metrics.k8s.io/v1beta1")
                .with_resources(GroupVersionResource::core("services"), Vec::new()),
        );
        assert!(cluster.api_version_served("metrics.k8s.io/v1beta1").await.unwrap());
        assert!(cluster.api_version_served("v1").await.unwrap());
        assert!(!cluster.api_version_served("custom.metrics.k8s.io/v1beta2").await.unwrap());
    }

    #[test]
    fn test_snapshot_yaml_document() {
        let raw = r#"
serverVersion: v1.31.2-eks
crds:
  - nodepools.karpenter.sh
pods:
  - namespace: kube-system
    name: coredns-1
    labels:
      k8s-app: kube-dns
    phase: Running
resources:
  - group: karpenter.sh
    version: v1
    resource: nodepools
    items:
      - metadata:
          name: default
"#;
        let snapshot: ClusterSnapshot = serde_yaml::from_str(raw).unwrap();
        assert_eq!(snapshot.server_version.as_deref(), Some("v1.31.2-eks"));
        assert!(snapshot.crds.contains("nodepools.karpenter.sh"));
        assert_eq!(snapshot.pods[0].labels["k8s-app"], "kube-dns");
        assert_eq!(snapshot.resources[0].gvr.resource, "nodepools");
        assert_eq!(snapshot.resources[0].items[0].name(), Some("default"));
    }
}
