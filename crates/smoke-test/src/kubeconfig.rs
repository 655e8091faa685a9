//! Connecting to the cluster under test.

use std::path::Path;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::cluster::KubeCluster;

/// Resolve client configuration for `kubeconfig` and `context`.
///
/// With an explicit path that single file is read. Without one the usual
/// discovery applies: every file listed in `KUBECONFIG` merged in order,
/// then `~/.kube/config`, then the in-cluster service account.
///
/// # Errors
///
/// Returns an error if no kubeconfig can be read or the context does not
/// exist.
pub async fn load_config(kubeconfig: Option<&Path>, context: Option<String>) -> Result<Config> {
    let options = KubeConfigOptions {
        context,
        ..Default::default()
    };

    let config = match kubeconfig {
        Some(path) => {
            let raw = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig from {}", path.display()))?;
            debug!(
                path = %path.display(),
                current_context = ?raw.current_context,
                "Loaded kubeconfig"
            );
            Config::from_custom_kubeconfig(raw, &options)
                .await
                .context("Failed to create Kubernetes config from kubeconfig")?
        }
        None if options.context.is_some() => Config::from_kubeconfig(&options)
            .await
            .context("Failed to load kubeconfig context")?,
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };
    Ok(config)
}

/// Build a client for the cluster named by `kubeconfig` and `context`.
///
/// No request is made here: an unreachable API server shows up later as
/// failed checks, not as an error from this function.
///
/// # Errors
///
/// Returns an error if the configuration cannot be resolved or the client
/// cannot be constructed.
pub async fn connect(kubeconfig: Option<&Path>, context: Option<String>) -> Result<KubeCluster> {
    let config = load_config(kubeconfig, context).await?;
    info!(cluster = %config.cluster_url, "Connecting to cluster");
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(KubeCluster::new(client))
}
