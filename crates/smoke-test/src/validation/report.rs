//! Outcome and verdict types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a single check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warning => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// What one probe invocation concluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub label: String,
    pub severity: Severity,
}

impl Outcome {
    pub fn pass(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            severity: Severity::Pass,
        }
    }

    pub fn warn(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            severity: Severity::Warning,
        }
    }

    pub fn fail(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            severity: Severity::Fail,
        }
    }

    /// Pass when `ok`, otherwise fail, with the same label.
    pub fn require(ok: bool, label: impl Into<String>) -> Self {
        if ok {
            Self::pass(label)
        } else {
            Self::fail(label)
        }
    }

    /// Turn a failure into a warning; other severities are unchanged.
    #[must_use]
    pub fn downgraded(mut self) -> Self {
        if self.severity == Severity::Fail {
            self.severity = Severity::Warning;
        }
        self
    }
}

/// Subsystem concerns, in run order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    ClusterHealth,
    CoreAddons,
    Security,
    Networking,
    BackupRecovery,
    ResourceOptimization,
    Observability,
}

impl Subsystem {
    pub const ALL: [Self; 7] = [
        Self::ClusterHealth,
        Self::CoreAddons,
        Self::Security,
        Self::Networking,
        Self::BackupRecovery,
        Self::ResourceOptimization,
        Self::Observability,
    ];

    /// Report header.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ClusterHealth => "CLUSTER HEALTH",
            Self::CoreAddons => "CORE ADDONS",
            Self::Security => "SECURITY CONFIGURATION",
            Self::Networking => "NETWORKING",
            Self::BackupRecovery => "BACKUP AND RECOVERY",
            Self::ResourceOptimization => "RESOURCE OPTIMIZATION",
            Self::Observability => "OBSERVABILITY",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An outcome tagged with where in the report it belongs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedOutcome {
    pub subsystem: Subsystem,
    pub section: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Run-level aggregate of every recorded severity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub pass_count: usize,
    pub fail_count: usize,
    pub warn_count: usize,
    pub overall_failed: bool,
}

impl Verdict {
    #[must_use]
    pub fn total(&self) -> usize {
        self.pass_count + self.fail_count + self.warn_count
    }

    /// Process exit status: `1` if anything failed. Warnings never count.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        u8::from(self.overall_failed)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: String,
    pub outcomes: Vec<RecordedOutcome>,
    pub verdict: Verdict,
}

impl RunReport {
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        self.verdict.exit_status()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.verdict.overall_failed
    }

    /// Outcomes of one subsystem, in execution order.
    pub fn for_subsystem(&self, subsystem: Subsystem) -> impl Iterator<Item = &RecordedOutcome> {
        self.outcomes.iter().filter(move |o| o.subsystem == subsystem)
    }

    /// Just the `(label, severity)` pairs, in report order.
    #[must_use]
    pub fn labels(&self) -> Vec<(String, Severity)> {
        self.outcomes
            .iter()
            .map(|o| (o.outcome.label.clone(), o.outcome.severity))
            .collect()
    }
}
