//! Dispatch policies and outcomes.

use serde::{Deserialize, Serialize};

/// What the dispatcher does when a backend cannot be reached.
///
/// The caller is acknowledged either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardErrorPolicy {
    /// Stop; record nothing.
    Acknowledge,
    /// Substitute a sentinel for the failed side and compare anyway.
    #[default]
    RecordSentinel,
}

/// Which backend a forward targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Control,
    Experiment,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Control => "control",
            Side::Experiment => "experiment",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Responses were semantically equal.
    Equal,
    /// Responses differed and a diff was recorded.
    Diff,
    /// Nothing was compared (capture failure, or a forward failure under `Acknowledge`).
    Skipped,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Equal => "equal",
            DispatchOutcome::Diff => "diff",
            DispatchOutcome::Skipped => "skipped",
        }
    }
}
