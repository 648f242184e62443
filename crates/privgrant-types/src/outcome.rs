//! Per-step outcomes and the aggregate run report.
//!
//! A run touches many surface instances in a fixed order; each one ends in
//! exactly one [`StepOutcome`]. The caller (a CLI, a deployment batch)
//! renders the [`RunReport`] — nothing here prints or exits.

use serde::{Deserialize, Serialize};

/// One securable surface instance touched by a run.
///
/// The instance-less variants (`Groups`, `Filesystem`, `Services`) are
/// used when a whole step family was skipped by configuration and no
/// concrete instance was ever resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    /// The local group-membership step as a whole.
    Groups,
    /// Membership in one named local group.
    LocalGroup(String),
    /// The access-control list of one management namespace.
    Namespace(String),
    /// The filesystem/share step as a whole.
    Filesystem,
    /// The discretionary ACL of one directory.
    Directory(String),
    /// The access-control list of one network share.
    Share(String),
    /// The service-descriptor step as a whole.
    Services,
    /// The security descriptor of one service.
    Service(String),
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groups => f.write_str("groups"),
            Self::LocalGroup(g) => write!(f, "group '{g}'"),
            Self::Namespace(ns) => write!(f, "namespace '{ns}'"),
            Self::Filesystem => f.write_str("filesystem"),
            Self::Directory(p) => write!(f, "directory '{p}'"),
            Self::Share(s) => write!(f, "share '{s}'"),
            Self::Services => f.write_str("services"),
            Self::Service(s) => write!(f, "service '{s}'"),
        }
    }
}

/// How one surface step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The grant was absent and has been written.
    Applied,
    /// The grant was already present; nothing was written.
    AlreadySatisfied,
    /// The step was skipped (by configuration, or because the surface
    /// does not exist on this host).
    Skipped,
    /// The step failed; the run continued to the next step.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl StepOutcome {
    /// Builds a `Failed` outcome from any displayable error.
    #[must_use]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    /// True for `Applied` and `AlreadySatisfied`.
    #[must_use]
    pub fn converged(&self) -> bool {
        matches!(self, Self::Applied | Self::AlreadySatisfied)
    }

    /// True for `Failed`.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short status string for rendering and logs.
    #[must_use]
    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadySatisfied => "already-satisfied",
            Self::Skipped => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.status_str()),
        }
    }
}

/// One `(surface, outcome)` pair in run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub surface: Surface,
    pub outcome: StepOutcome,
}

/// Ordered, non-exception-based summary of one orchestrator run.
///
/// # Success Criterion
///
/// A run [`succeeded`](Self::succeeded) iff no step `Failed`. `Skipped`
/// steps and warnings (for example a service pattern that matched
/// nothing) do not affect success on their own.
///
/// # Example
///
/// ```
/// use privgrant_types::{RunReport, StepOutcome, Surface};
///
/// let mut report = RunReport::new(r"CORP\svc");
/// report.record(Surface::Namespace("root/cimv2".into()), StepOutcome::Applied);
/// report.record(
///     Surface::LocalGroup("Performance Monitor Users".into()),
///     StepOutcome::AlreadySatisfied,
/// );
/// assert!(report.succeeded());
/// assert_eq!(report.failures(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    principal: String,
    steps: Vec<StepRecord>,
    warnings: Vec<String>,
}

impl RunReport {
    /// Starts an empty report for the given principal string.
    #[must_use]
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The principal string this run was for, as entered.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Appends one step result, preserving run order.
    pub fn record(&mut self, surface: Surface, outcome: StepOutcome) {
        self.steps.push(StepRecord { surface, outcome });
    }

    /// Appends a non-fatal warning.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// The recorded steps, in run order.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// The recorded warnings, in run order.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failure()).count()
    }

    /// True when every attempted step converged or was skipped.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failures() == 0
    }
}
