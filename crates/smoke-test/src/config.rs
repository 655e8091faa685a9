//! Deployment profile and output configuration.
//!
//! A [`Profile`] names the workloads, CRDs and custom resources each check
//! group inspects. The checks themselves are fixed; only this data changes
//! between deployments. The built-in profile targets an EKS cluster with the
//! standard add-on set and is embedded from `profiles/eks.yaml`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::GroupVersionResource;

const BUILTIN_PROFILE: &str = include_str!("../profiles/eks.yaml");

/// Annotation binding a service account to a cloud IAM role.
const DEFAULT_CREDENTIAL_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

/// Errors raised while loading or validating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Resource `{0}` lists no API versions")]
    NoVersions(String),

    #[error("Workload `{0}` has no namespace")]
    NoNamespace(String),
}

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, grouped, human-readable report.
    #[default]
    Text,
    /// Machine-readable run report.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Unknown output format: {s}. Supported: text, json")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Pods selected by label in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadTarget {
    pub name: String,
    pub namespace: String,
    pub selector: String,
    /// Optional workloads report a warning instead of a failure.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Report only when pods are running; an absent workload records nothing.
    #[serde(default)]
    pub silent_when_absent: bool,
}

/// A CustomResourceDefinition that must be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrdTarget {
    /// Full CRD name, e.g. `nodepools.karpenter.sh`.
    pub name: String,
    pub display: String,
}

/// A named object in a namespace (service account, service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

/// A custom resource reachable under one of several API versions.
///
/// `versions[0]` is the primary; the rest are fallbacks tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResourceSpec {
    pub display: String,
    pub group: String,
    pub versions: Vec<String>,
    pub resource: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Label when objects exist; `{count}` is replaced by the number found.
    #[serde(default)]
    pub present_label: Option<String>,
    /// Label when none exist or none can be listed.
    #[serde(default)]
    pub empty_label: Option<String>,
}

impl VersionedResourceSpec {
    #[must_use]
    pub fn gvr(&self, version: &str) -> GroupVersionResource {
        GroupVersionResource::new(&self.group, version, &self.resource)
    }

    #[must_use]
    pub fn present_label(&self, count: usize) -> String {
        match &self.present_label {
            Some(template) => template.replace("{count}", &count.to_string()),
            None => format!("{} configured: {count}", self.display),
        }
    }

    #[must_use]
    pub fn empty_label(&self) -> String {
        self.empty_label
            .clone()
            .unwrap_or_else(|| format!("No {} configured", self.display))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscalerProfile {
    pub title: String,
    pub controller: WorkloadTarget,
    pub crds: Vec<CrdTarget>,
    pub resources: Vec<VersionedResourceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterHealthProfile {
    pub system_workloads: Vec<WorkloadTarget>,
    pub autoscaler: AutoscalerProfile,
    #[serde(default)]
    pub node_lifecycle: Vec<WorkloadTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonsProfile {
    pub crds: Vec<CrdTarget>,
    pub workloads: Vec<WorkloadTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityProfile {
    pub secret_store: VersionedResourceSpec,
    pub external_secrets: VersionedResourceSpec,
    pub policies_title: String,
    pub policies: VersionedResourceSpec,
    pub cert_manager: WorkloadTarget,
    pub issuers: VersionedResourceSpec,
    pub certificates: VersionedResourceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkingProfile {
    pub ingress_title: String,
    pub ingress_controller: WorkloadTarget,
    pub external_dns: WorkloadTarget,
    pub external_dns_account: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupProfile {
    pub title: String,
    pub agent: WorkloadTarget,
    pub service_account: ObjectRef,
    pub storage_locations: VersionedResourceSpec,
    pub schedules: VersionedResourceSpec,
    pub backups: VersionedResourceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProfile {
    pub title: String,
    pub recommender: WorkloadTarget,
    pub crd: CrdTarget,
    pub recommendations: VersionedResourceSpec,
    pub dashboard_display: String,
    pub dashboard_service: ObjectRef,
    pub reloader: WorkloadTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityProfile {
    pub metrics_server: WorkloadTarget,
    pub metrics_api: String,
    pub node_metrics: VersionedResourceSpec,
    pub agents_title: String,
    pub agents: Vec<WorkloadTarget>,
    pub monitoring_title: String,
    pub monitoring_namespace: String,
    pub collectors: Vec<WorkloadTarget>,
    /// Name used in the dashboard ingress label, e.g. `Grafana`.
    pub dashboard_display: String,
}

/// Everything the check groups need to know about one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default = "default_credential_annotation")]
    pub credential_annotation: String,
    pub cluster: ClusterHealthProfile,
    pub addons: AddonsProfile,
    pub security: SecurityProfile,
    pub networking: NetworkingProfile,
    pub backup: BackupProfile,
    pub optimization: OptimizationProfile,
    pub observability: ObservabilityProfile,
}

fn default_credential_annotation() -> String {
    DEFAULT_CREDENTIAL_ANNOTATION.to_string()
}

impl Profile {
    /// The embedded EKS profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded document fails to parse or validate.
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_yaml(BUILTIN_PROFILE)
    }

    /// Parse and validate a profile document.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or the profile is inconsistent.
    pub fn from_yaml(raw: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_yaml::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the profile is invalid.
    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Every versioned spec must try at least one version and every
    /// workload must name its namespace.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(spec) = self.versioned_specs().find(|s| s.versions.is_empty()) {
            return Err(ProfileError::NoVersions(spec.display.clone()));
        }
        if let Some(target) = self.workloads().find(|w| w.namespace.trim().is_empty()) {
            return Err(ProfileError::NoNamespace(target.name.clone()));
        }
        Ok(())
    }

    fn versioned_specs(&self) -> impl Iterator<Item = &VersionedResourceSpec> {
        let security = &self.security;
        let backup = &self.backup;
        self.cluster
            .autoscaler
            .resources
            .iter()
            .chain([
                &security.secret_store,
                &security.external_secrets,
                &security.policies,
                &security.issuers,
                &security.certificates,
                &backup.storage_locations,
                &backup.schedules,
                &backup.backups,
                &self.optimization.recommendations,
                &self.observability.node_metrics,
            ])
    }

    fn workloads(&self) -> impl Iterator<Item = &WorkloadTarget> {
        self.cluster
            .system_workloads
            .iter()
            .chain(std::iter::once(&self.cluster.autoscaler.controller))
            .chain(&self.cluster.node_lifecycle)
            .chain(&self.addons.workloads)
            .chain([
                &self.security.cert_manager,
                &self.networking.ingress_controller,
                &self.networking.external_dns,
                &self.backup.agent,
                &self.optimization.recommender,
                &self.optimization.reloader,
                &self.observability.metrics_server,
            ])
            .chain(&self.observability.agents)
            .chain(&self.observability.collectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_profile_loads() {
        let profile = Profile::builtin().unwrap();
        assert_eq!(profile.name, "eks");
        assert_eq!(profile.credential_annotation, "eks.amazonaws.com/role-arn");
        assert_eq!(profile.cluster.system_workloads.len(), 3);
        assert_eq!(profile.addons.crds.len(), 11);
        assert_eq!(profile.addons.workloads.len(), 11);
        assert_eq!(
            profile.security.secret_store.versions,
            vec!["v1".to_string(), "v1beta1".to_string()]
        );
        assert_eq!(
            profile.security.secret_store.name.as_deref(),
            Some("aws-secrets-manager")
        );
    }

    #[test]
    fn test_optional_workloads_default_to_required() {
        let profile = Profile::builtin().unwrap();
        assert!(profile.cluster.system_workloads.iter().all(|w| w.required));
        let fluent_bit = profile
            .observability
            .agents
            .iter()
            .find(|w| w.name == "Fluent Bit")
            .unwrap();
        assert!(!fluent_bit.required);
        assert!(fluent_bit.silent_when_absent);
    }

    #[test]
    fn test_count_labels_default_and_override() {
        let profile = Profile::builtin().unwrap();
        let issuers = &profile.security.issuers;
        assert_eq!(issuers.present_label(2), "ClusterIssuers configured: 2");
        assert_eq!(issuers.empty_label(), "No ClusterIssuers configured");

        let schedules = &profile.backup.schedules;
        assert_eq!(schedules.present_label(3), "Backup schedules: 3");
        assert_eq!(schedules.empty_label(), "No backup schedules configured");
        assert_eq!(
            profile.optimization.recommendations.empty_label(),
            "No VPAs configured (Goldilocks may create them automatically)"
        );
    }

    #[test]
    fn test_rejects_spec_without_versions() {
        let mut profile = Profile::builtin().unwrap();
        profile.backup.schedules.versions.clear();
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, ProfileError::NoVersions(ref d) if d == "Schedules"));
    }

    #[test]
    fn test_rejects_workload_without_namespace() {
        let mut profile = Profile::builtin().unwrap();
        profile.observability.collectors[0].namespace = "  ".to_string();
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::NoNamespace(_))
        ));
    }

    #[test]
    fn test_from_path_roundtrips_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUILTIN_PROFILE.as_bytes()).unwrap();
        let profile = Profile::from_path(file.path()).unwrap();
        assert_eq!(profile.name, "eks");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Profile::from_path(Path::new("/nonexistent/profile.yaml")).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "text");
    }
}
