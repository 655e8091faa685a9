//! Runs check groups against one cluster and closes out the report.

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::aggregator::{GroupRecorder, ResultAggregator};
use super::checks::{standard_groups, CheckGroup};
use super::report::RunReport;
use crate::cluster::ClusterQuery;
use crate::config::Profile;

/// How groups are scheduled.
///
/// Outcomes within a group always keep their order; only whole groups are
/// interleaved under [`Executor::Concurrent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Executor {
    #[default]
    Sequential,
    /// At most `limit` groups in flight.
    Concurrent { limit: usize },
}

impl Executor {
    /// `Sequential` for a limit of 0 or 1.
    #[must_use]
    pub fn with_concurrency(limit: usize) -> Self {
        if limit > 1 {
            Self::Concurrent { limit }
        } else {
            Self::Sequential
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Done,
}

pub struct Orchestrator {
    groups: Vec<Box<dyn CheckGroup>>,
    executor: Executor,
    state: RunState,
}

impl Orchestrator {
    #[must_use]
    pub fn new(groups: Vec<Box<dyn CheckGroup>>) -> Self {
        Self {
            groups,
            executor: Executor::default(),
            state: RunState::Idle,
        }
    }

    /// The standard groups configured from `profile`.
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(standard_groups(profile))
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every group once and produce the report.
    ///
    /// Each call starts from an empty aggregator, so repeated runs against
    /// an unchanged cluster produce the same outcomes.
    pub async fn run(&mut self, cluster: &dyn ClusterQuery) -> RunReport {
        self.state = RunState::Running;
        info!(
            groups = self.groups.len(),
            executor = ?self.executor,
            "Running smoke tests"
        );

        let aggregator = ResultAggregator::new();
        match self.executor {
            Executor::Sequential => {
                for group in &self.groups {
                    run_group(group.as_ref(), cluster, &aggregator).await;
                }
            }
            Executor::Concurrent { limit } => {
                stream::iter(&self.groups)
                    .map(|group| run_group(group.as_ref(), cluster, &aggregator))
                    .buffer_unordered(limit.max(1))
                    .collect::<Vec<()>>()
                    .await;
            }
        }

        let report = aggregator.into_report();
        self.state = RunState::Done;
        info!(
            passed = report.verdict.pass_count,
            failed = report.verdict.fail_count,
            warnings = report.verdict.warn_count,
            "Smoke tests complete"
        );
        report
    }
}

async fn run_group(
    group: &dyn CheckGroup,
    cluster: &dyn ClusterQuery,
    aggregator: &ResultAggregator,
) {
    let subsystem = group.subsystem();
    debug!(%subsystem, "Running check group");
    let mut recorder = GroupRecorder::new(aggregator, subsystem);
    group.run(cluster, &mut recorder).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterSnapshot, SnapshotCluster};
    use crate::validation::report::{Severity, Subsystem};
    use async_trait::async_trait;

    /// Emits a fixed list of outcomes.
    struct Scripted {
        subsystem: Subsystem,
        severities: Vec<Severity>,
    }

    #[async_trait]
    impl CheckGroup for Scripted {
        fn subsystem(&self) -> Subsystem {
            self.subsystem
        }

        async fn run(&self, _cluster: &dyn ClusterQuery, rec: &mut GroupRecorder<'_>) {
            for (i, severity) in self.severities.iter().enumerate() {
                let label = format!("{} #{i}", self.subsystem);
                match severity {
                    Severity::Pass => rec.pass(label),
                    Severity::Warning => rec.warn(label),
                    Severity::Fail => rec.fail(label),
                }
            }
        }
    }

    fn scripted(subsystem: Subsystem, severities: &[Severity]) -> Box<dyn CheckGroup> {
        Box::new(Scripted {
            subsystem,
            severities: severities.to_vec(),
        })
    }

    #[test]
    fn test_with_concurrency() {
        assert_eq!(Executor::with_concurrency(0), Executor::Sequential);
        assert_eq!(Executor::with_concurrency(1), Executor::Sequential);
        assert_eq!(
            Executor::with_concurrency(4),
            Executor::Concurrent { limit: 4 }
        );
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let mut orchestrator =
            Orchestrator::new(vec![scripted(Subsystem::Security, &[Severity::Pass])]);
        assert_eq!(orchestrator.state(), RunState::Idle);
        orchestrator.run(&SnapshotCluster::default()).await;
        assert_eq!(orchestrator.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_warnings_never_fail_the_run() {
        let mut orchestrator = Orchestrator::new(vec![
            scripted(Subsystem::ClusterHealth, &[Severity::Pass, Severity::Warning]),
            scripted(Subsystem::BackupRecovery, &[Severity::Warning; 4]),
        ]);
        let report = orchestrator.run(&SnapshotCluster::default()).await;
        assert_eq!(report.verdict.warn_count, 5);
        assert_eq!(report.exit_status(), 0);
    }

    #[tokio::test]
    async fn test_repeated_runs_do_not_accumulate() {
        let mut orchestrator = Orchestrator::new(vec![scripted(
            Subsystem::Networking,
            &[Severity::Pass, Severity::Fail],
        )]);
        let cluster = SnapshotCluster::default();
        let first = orchestrator.run(&cluster).await;
        let second = orchestrator.run(&cluster).await;
        assert_eq!(first.verdict, second.verdict);
        assert_eq!(second.outcomes.len(), 2);
        assert_eq!(second.exit_status(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let groups = || {
            vec![
                scripted(Subsystem::Observability, &[Severity::Pass, Severity::Warning]),
                scripted(Subsystem::ClusterHealth, &[Severity::Fail, Severity::Pass]),
                scripted(Subsystem::Security, &[Severity::Pass; 3]),
            ]
        };
        let cluster = SnapshotCluster::new(ClusterSnapshot::default());

        let sequential = Orchestrator::new(groups()).run(&cluster).await;
        let concurrent = Orchestrator::new(groups())
            .with_executor(Executor::Concurrent { limit: 3 })
            .run(&cluster)
            .await;

        assert_eq!(sequential.verdict, concurrent.verdict);
        assert_eq!(sequential.labels(), concurrent.labels());
        assert_eq!(sequential.outcomes[0].subsystem, Subsystem::ClusterHealth);
    }
}
