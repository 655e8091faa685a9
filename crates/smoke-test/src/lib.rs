//! Read-only smoke testing for a Kubernetes cluster and its add-ons.
//!
//! The engine runs a fixed set of check groups (cluster health, add-ons,
//! security, networking, backup, resource optimization, observability)
//! against a [`cluster::ClusterQuery`], collects a pass/warning/fail outcome
//! for every check and derives a single verdict from them.
//!
//! # Example
//!
//! ```ignore
//! use cluster_smoke::{kubeconfig, validation, Executor, Profile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cluster = kubeconfig::connect(None, None).await?;
//!     let profile = Profile::builtin()?;
//!     let report = validation::run_validation(&cluster, &profile, Executor::Sequential).await;
//!     std::process::exit(i32::from(report.exit_status()));
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod cluster;
pub mod commands;
pub mod config;
pub mod kubeconfig;
pub mod ui;
pub mod validation;

// Re-export commonly used types at the crate root
pub use cluster::{ClusterQuery, KubeCluster, SnapshotCluster};
pub use config::{OutputFormat, Profile};
pub use validation::{Executor, Orchestrator, Outcome, RunReport, Severity, Verdict};
