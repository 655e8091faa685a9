//! Cluster smoke test CLI.
//!
//! Inspects a running Kubernetes cluster (or a captured snapshot of one)
//! without changing anything, prints a grouped pass/warn/fail report, and
//! exits non-zero if any check failed.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cluster_smoke::commands::RunCommand;

/// Read-only smoke test for a Kubernetes cluster and its add-ons.
#[derive(Parser)]
#[command(
    name = "smoke-test",
    version,
    about = "Read-only cluster smoke test",
    long_about = "Smoke-test a running Kubernetes cluster and its add-ons.\n\n\
                  Checks node health, system pods, autoscaling, secrets, policies,\n\
                  certificates, networking, backups, right-sizing and observability.\n\
                  Nothing in the cluster is modified. Warnings never fail the run;\n\
                  any failed check makes the process exit with status 1."
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    run: RunCommand,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info,cluster_smoke=debug")
    } else {
        EnvFilter::new("warn,cluster_smoke=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let report = cli.run.run().await?;
    Ok(ExitCode::from(report.exit_status()))
}
