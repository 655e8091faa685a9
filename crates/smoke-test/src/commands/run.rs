//! Run command - read-only smoke test of a live or captured cluster.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::cluster::{ClusterQuery, ClusterSnapshot, SnapshotCluster};
use crate::config::{OutputFormat, Profile};
use crate::kubeconfig;
use crate::ui;
use crate::validation::{self, Executor, RunReport};

/// Smoke-test a cluster.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Path to a single kubeconfig file. Defaults to the usual discovery,
    /// which merges every file listed in `KUBECONFIG`.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one.
    #[arg(long)]
    context: Option<String>,

    /// Deployment profile (YAML). Defaults to the built-in EKS profile.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Audit a captured cluster snapshot (YAML or JSON) instead of a live cluster.
    #[arg(long, conflicts_with = "context")]
    snapshot: Option<PathBuf>,

    /// Check groups to run at once (0 or 1 runs them one after another).
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Report format: text or json.
    #[arg(long, short, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl RunCommand {
    fn load_profile(&self) -> Result<Profile> {
        let profile = match &self.profile {
            Some(path) => Profile::from_path(path)?,
            None => Profile::builtin().context("Built-in profile is invalid")?,
        };
        info!(profile = %profile.name, "Loaded profile");
        Ok(profile)
    }

    /// The cluster to test, plus a description for the banner.
    async fn cluster(&self) -> Result<(Box<dyn ClusterQuery>, String)> {
        if let Some(path) = &self.snapshot {
            let snapshot = ClusterSnapshot::from_path(path)?;
            return Ok((
                Box::new(SnapshotCluster::new(snapshot)),
                format!("Snapshot: {}", path.display()),
            ));
        }

        let cluster =
            kubeconfig::connect(self.kubeconfig.as_deref(), self.context.clone()).await?;
        let target = match (&self.context, &self.kubeconfig) {
            (Some(context), _) => format!("Context: {context}"),
            (None, Some(path)) => format!("Kubeconfig: {}", path.display()),
            (None, None) => "Current kubeconfig context".to_string(),
        };
        Ok((Box::new(cluster), target))
    }

    /// Run every check group and print the report.
    ///
    /// # Errors
    ///
    /// Returns an error only if setup fails: an unreadable profile,
    /// snapshot or kubeconfig. Cluster problems are reported as outcomes.
    pub async fn run(&self) -> Result<RunReport> {
        let profile = self.load_profile()?;
        let (cluster, target) = self.cluster().await?;
        let executor = Executor::with_concurrency(self.concurrency);

        if self.output == OutputFormat::Text {
            ui::print_banner(&target);
        }

        let report = validation::run_validation(cluster.as_ref(), &profile, executor).await;

        match self.output {
            OutputFormat::Text => ui::print_report(&report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        Ok(report)
    }
}
