//! Core types for reconciliation results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Expand,
    Fetch,
    Diff,
    Plan,
    Execute,
    Verify,
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Expand => "expand",
            Self::Fetch => "fetch",
            Self::Diff => "diff",
            Self::Plan => "plan",
            Self::Execute => "execute",
            Self::Verify => "verify",
            Self::Report => "report",
        };
        write!(f, "{name}")
    }
}

/// Result of applying one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Record was created
    Created,
    /// Record was modified
    Modified,
    /// Record was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// One reported change, keyed by the identity it touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Stable identity (name, device ID, commit ID)
    pub id: String,
    #[serde(flatten)]
    pub result: ApplyResult,
}

impl ItemResult {
    pub fn new(id: impl Into<String>, result: ApplyResult) -> Self {
        Self {
            id: id.into(),
            result,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of items processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Outcome of the read-back after mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    /// Nothing was mutated, so nothing to verify
    NotNeeded,
    /// Mutations were planned but not applied (dry run)
    Skipped,
    /// Observed state matches desired state
    Confirmed,
    /// Still not visible after the staleness window
    Unconfirmed { pending: Vec<String> },
}

/// Final report of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Whether remote state was (or, in a dry run, would be) changed
    pub changed: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
    pub summary: ExecuteSummary,
    pub items: Vec<ItemResult>,
    pub verification: Verification,
}

impl Report {
    /// Report for a run that found nothing to do
    pub fn unchanged(items: Vec<ItemResult>) -> Self {
        let mut report = Self {
            changed: false,
            dry_run: false,
            summary: ExecuteSummary::default(),
            items: Vec::new(),
            verification: Verification::NotNeeded,
        };
        for item in items {
            report.push(item);
        }
        report
    }

    /// Build a report from applied item results
    pub fn from_items(items: Vec<ItemResult>, dry_run: bool) -> Self {
        let mut report = Self::unchanged(Vec::new());
        report.dry_run = dry_run;
        for item in items {
            report.push(item);
        }
        if dry_run && report.changed {
            report.verification = Verification::Skipped;
        }
        report
    }

    /// Record one item result
    pub fn push(&mut self, item: ItemResult) {
        self.summary.add_result(&item.result);
        if item.result.is_change() {
            self.changed = true;
        }
        self.items.push(item);
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just report what would happen
    pub dry_run: bool,
    /// Read-backs performed before giving up on verification
    pub verify_attempts: u32,
    /// Pause between read-backs
    pub verify_interval: std::time::Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verify_attempts: 3,
            verify_interval: std::time::Duration::from_secs(2),
        }
    }
}
