//! Read-only cluster validation.
//!
//! Probes inspect the cluster through a [`ClusterQuery`], check groups
//! combine probes per subsystem, and the [`Orchestrator`] runs the groups
//! and folds every outcome into a single [`RunReport`].

pub mod aggregator;
pub mod checks;
pub mod orchestrator;
pub mod probes;
pub mod report;

use tracing::info;

use crate::cluster::ClusterQuery;
use crate::config::Profile;

pub use aggregator::{GroupRecorder, ResultAggregator};
pub use checks::{standard_groups, CheckGroup};
pub use orchestrator::{Executor, Orchestrator, RunState};
pub use report::{Outcome, RecordedOutcome, RunReport, Severity, Subsystem, Verdict};

/// Run the standard check groups from `profile` against `cluster`.
///
/// Never fails: every problem the cluster has ends up as an outcome in the
/// report, and the report's exit status says whether any of them failed.
pub async fn run_validation(
    cluster: &dyn ClusterQuery,
    profile: &Profile,
    executor: Executor,
) -> RunReport {
    info!(profile = %profile.name, "🔍 Starting cluster smoke tests...");

    let report = Orchestrator::from_profile(profile)
        .with_executor(executor)
        .run(cluster)
        .await;

    if report.all_passed() {
        info!(
            "✅ Smoke tests passed: {} checks, {} warnings",
            report.verdict.total(),
            report.verdict.warn_count
        );
    } else {
        info!(
            "⚠️  Smoke tests complete: {}/{} checks passed, {} failed",
            report.verdict.pass_count,
            report.verdict.total(),
            report.verdict.fail_count
        );
    }

    report
}
