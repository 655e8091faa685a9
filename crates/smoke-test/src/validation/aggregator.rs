//! Append-only result accumulator.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::report::{Outcome, RecordedOutcome, RunReport, Severity, Subsystem, Verdict};

#[derive(Debug, Default)]
struct Tally {
    entries: Vec<RecordedOutcome>,
    pass: usize,
    fail: usize,
    warn: usize,
}

/// Collects every outcome of one run.
///
/// `record` takes `&self` and serializes through a mutex so check groups
/// may run concurrently against the same aggregator.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    tally: Mutex<Tally>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, entry: RecordedOutcome) {
        debug!(
            subsystem = %entry.subsystem,
            severity = %entry.outcome.severity,
            label = %entry.outcome.label,
            "Recorded outcome"
        );
        let mut tally = self.lock();
        match entry.outcome.severity {
            Severity::Pass => tally.pass += 1,
            Severity::Warning => tally.warn += 1,
            Severity::Fail => tally.fail += 1,
        }
        tally.entries.push(entry);
    }

    #[must_use]
    pub fn summary(&self) -> Verdict {
        let tally = self.lock();
        Verdict {
            pass_count: tally.pass,
            fail_count: tally.fail,
            warn_count: tally.warn,
            overall_failed: tally.fail > 0,
        }
    }

    /// Close the run. Outcomes are ordered by subsystem; within a subsystem
    /// they keep the order they were recorded in.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        let verdict = self.summary();
        let mut outcomes = self
            .tally
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .entries;
        outcomes.sort_by_key(|entry| entry.subsystem);

        RunReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            outcomes,
            verdict,
        }
    }
}

/// A group's handle onto the aggregator.
///
/// Tags every outcome with the group's subsystem and the current section.
pub struct GroupRecorder<'a> {
    aggregator: &'a ResultAggregator,
    subsystem: Subsystem,
    section: String,
}

impl<'a> GroupRecorder<'a> {
    #[must_use]
    pub fn new(aggregator: &'a ResultAggregator, subsystem: Subsystem) -> Self {
        Self {
            aggregator,
            subsystem,
            section: String::new(),
        }
    }

    /// Start a new titled section; later outcomes belong to it.
    pub fn section(&mut self, title: &str) {
        title.clone_into(&mut self.section);
    }

    /// Record an outcome. `None` records nothing.
    pub fn record(&mut self, outcome: impl Into<Option<Outcome>>) {
        let Some(outcome) = outcome.into() else {
            return;
        };
        self.aggregator.record(RecordedOutcome {
            subsystem: self.subsystem,
            section: self.section.clone(),
            outcome,
        });
    }

    pub fn pass(&mut self, label: impl Into<String>) {
        self.record(Outcome::pass(label));
    }

    pub fn warn(&mut self, label: impl Into<String>) {
        self.record(Outcome::warn(label));
    }

    pub fn fail(&mut self, label: impl Into<String>) {
        self.record(Outcome::fail(label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_match_recorded_outcomes() {
        let aggregator = ResultAggregator::new();
        let mut rec = GroupRecorder::new(&aggregator, Subsystem::ClusterHealth);
        rec.section("Node Health");
        rec.pass("Nodes ready: 3");
        rec.warn("Nodes not ready: 1");
        rec.fail("CoreDNS: no pods running");
        rec.pass("kube-proxy: 3 running");

        let verdict = aggregator.summary();
        assert_eq!(verdict.pass_count, 2);
        assert_eq!(verdict.warn_count, 1);
        assert_eq!(verdict.fail_count, 1);
        assert!(verdict.overall_failed);
        assert_eq!(verdict.total(), 4);
    }

    #[test]
    fn test_skipped_outcomes_are_not_counted() {
        let aggregator = ResultAggregator::new();
        let mut rec = GroupRecorder::new(&aggregator, Subsystem::Observability);
        rec.record(None::<Outcome>);
        rec.record(Some(Outcome::pass("Fluent Bit: 2 running")));
        assert_eq!(aggregator.summary().total(), 1);
    }

    #[test]
    fn test_warnings_alone_do_not_fail() {
        let aggregator = ResultAggregator::new();
        let mut rec = GroupRecorder::new(&aggregator, Subsystem::BackupRecovery);
        for _ in 0..5 {
            rec.warn("No Schedules configured");
        }
        let verdict = aggregator.summary();
        assert!(!verdict.overall_failed);
        assert_eq!(verdict.exit_status(), 0);
    }

    #[test]
    fn test_report_orders_by_subsystem_and_keeps_group_order() {
        let aggregator = ResultAggregator::new();
        let mut net = GroupRecorder::new(&aggregator, Subsystem::Networking);
        let mut cluster = GroupRecorder::new(&aggregator, Subsystem::ClusterHealth);

        net.pass("net-1");
        cluster.pass("cluster-1");
        net.pass("net-2");
        cluster.section("System Pods");
        cluster.fail("cluster-2");

        let report = aggregator.into_report();
        let labels: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| o.outcome.label.as_str())
            .collect();
        assert_eq!(labels, ["cluster-1", "cluster-2", "net-1", "net-2"]);
        assert_eq!(report.outcomes[0].section, "");
        assert_eq!(report.outcomes[1].section, "System Pods");
        assert_eq!(report.exit_status(), 1);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let aggregator = ResultAggregator::new();
        std::thread::scope(|scope| {
            for subsystem in Subsystem::ALL {
                let aggregator = &aggregator;
                scope.spawn(move || {
                    let mut rec = GroupRecorder::new(aggregator, subsystem);
                    for i in 0..50 {
                        rec.pass(format!("{subsystem} {i}"));
                    }
                });
            }
        });
        assert_eq!(aggregator.summary().pass_count, 7 * 50);
        assert_eq!(aggregator.into_report().outcomes.len(), 7 * 50);
    }
}
