//! [`ClusterQuery`] backed by a live API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::debug;

use super::{ClusterQuery, GroupVersionResource, QueryError, StructuredResource, WorkloadStatus};

/// kube-rs implementation of the cluster port.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> Api<DynamicObject> {
        let resource = api_resource(gvr);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

/// Build the dynamic API descriptor for a resource collection.
///
/// List and get URLs only need group, version and plural.
fn api_resource(gvr: &GroupVersionResource) -> ApiResource {
    ApiResource {
        group: gvr.group.clone(),
        version: gvr.version.clone(),
        api_version: gvr.api_version(),
        kind: String::new(),
        plural: gvr.resource.clone(),
    }
}

/// Sort a kube error into the port's taxonomy.
fn classify(err: kube::Error, what: &str) -> QueryError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => {
            QueryError::NotFound(format!("{what}: {}", ae.message))
        }
        other => QueryError::Connection(format!("{what}: {other}")),
    }
}

fn to_structured(obj: &DynamicObject, what: &str) -> Result<StructuredResource, QueryError> {
    serde_json::to_value(obj)
        .map(StructuredResource::new)
        .map_err(|e| QueryError::Connection(format!("{what}: failed to decode object: {e}")))
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    async fn server_version(&self) -> Result<String, QueryError> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| classify(e, "server version"))?;
        Ok(info.git_version)
    }

    async fn list_by_label(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<WorkloadStatus>, QueryError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(selector)
        };

        let list = pods
            .list(&params)
            .await
            .map_err(|e| classify(e, &format!("pods in {namespace} ({selector})")))?;

        debug!(namespace, selector, count = list.items.len(), "Listed pods");

        Ok(list
            .items
            .into_iter()
            .map(|pod| WorkloadStatus {
                name: pod.metadata.name.unwrap_or_default(),
                phase: pod.status.and_then(|s| s.phase),
            })
            .collect())
    }

    async fn custom_resource_definition_exists(&self, name: &str) -> Result<bool, QueryError> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        match crds.get_opt(name).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) => match classify(e, &format!("crd {name}")) {
                QueryError::NotFound(_) => Ok(false),
                err => Err(err),
            },
        }
    }

    async fn list_custom_resources(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> Result<Vec<StructuredResource>, QueryError> {
        let what = gvr.to_string();
        let list = self
            .dynamic_api(gvr, namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| classify(e, &what))?;

        debug!(resource = %what, count = list.items.len(), "Listed resources");

        list.items
            .iter()
            .map(|obj| to_structured(obj, &what))
            .collect()
    }

    async fn get_custom_resource(
        &self,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<StructuredResource, QueryError> {
        let what = format!("{gvr} {name}");
        let obj = self
            .dynamic_api(gvr, namespace)
            .get(name)
            .await
            .map_err(|e| classify(e, &what))?;
        to_structured(&obj, &what)
    }

    async fn api_version_served(&self, group_version: &str) -> Result<bool, QueryError> {
        let result = if group_version.contains('/') {
            self.client
                .list_api_group_resources(group_version)
                .await
                .map(|_| ())
        } else {
            self.client
                .list_core_api_resources(group_version)
                .await
                .map(|_| ())
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) => match classify(e, group_version) {
                QueryError::NotFound(_) => Ok(false),
                err => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resource_for_grouped_resource() {
        let ar = api_resource(&GroupVersionResource::new(
            "external-secrets.io",
            "v1beta1",
            "clustersecretstores",
        ));
        assert_eq!(ar.group, "external-secrets.io");
        assert_eq!(ar.version, "v1beta1");
        assert_eq!(ar.api_version, "external-secrets.io/v1beta1");
        assert_eq!(ar.plural, "clustersecretstores");
    }

    #[test]
    fn test_api_resource_for_core_resource() {
        let ar = api_resource(&GroupVersionResource::core("serviceaccounts"));
        assert_eq!(ar.group, "");
        assert_eq!(ar.api_version, "v1");
        assert_eq!(ar.plural, "serviceaccounts");
    }

    #[test]
    fn test_classify_not_found() {
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "nodepools.karpenter.sh not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        assert!(classify(err, "nodepools").is_not_found());
    }

    #[test]
    fn test_classify_forbidden_is_connection() {
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        assert!(matches!(classify(err, "pods"), QueryError::Connection(_)));
    }
}
