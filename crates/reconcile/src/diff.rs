//! Diff computation between desired and observed state
//!
//! Both sides are sets keyed by a stable identity (a name or a UUID, never a
//! display field). The result is the minimal change set: what to add and what
//! to remove. An empty result means there is nothing to do and no remote call
//! must be made.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Additions and removals needed to move observed state to desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDiff<T: Ord> {
    /// Identities desired but not observed
    pub to_add: BTreeSet<T>,
    /// Identities observed but not desired
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord + Clone> SetDiff<T> {
    /// Compute `desired - observed` and `observed - desired`
    pub fn compute(desired: &BTreeSet<T>, observed: &BTreeSet<T>) -> Self {
        Self {
            to_add: desired.difference(observed).cloned().collect(),
            to_remove: observed.difference(desired).cloned().collect(),
        }
    }

    /// Keep only the additions (for "ensure present" flows)
    pub fn additions_only(self) -> Self {
        Self {
            to_add: self.to_add,
            to_remove: BTreeSet::new(),
        }
    }

    /// Observed identities that were also desired (for "ensure absent" flows)
    ///
    /// Removing a listed identity only makes sense when it is actually present.
    pub fn present_of(desired: &BTreeSet<T>, observed: &BTreeSet<T>) -> Self {
        Self {
            to_add: BTreeSet::new(),
            to_remove: desired.intersection(observed).cloned().collect(),
        }
    }

    /// Observed state after applying this diff
    pub fn apply_to(&self, observed: &BTreeSet<T>) -> BTreeSet<T> {
        observed
            .difference(&self.to_remove)
            .cloned()
            .chain(self.to_add.iter().cloned())
            .collect()
    }

    /// Check if there is nothing to change
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Summary statistics
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            additions: self.to_add.len(),
            removals: self.to_remove.len(),
        }
    }
}

/// Compute the diff between a desired and an observed set
pub fn reconcile<T: Ord + Clone>(desired: &BTreeSet<T>, observed: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff::compute(desired, observed)
}

/// Diff summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Number of identities to add
    pub additions: usize,
    /// Number of identities to remove
    pub removals: usize,
}

impl DiffSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Reduce a search result to at most one record
///
/// Zero matches is `None`; more than one is an [`Error::AmbiguousMatch`]
/// naming every candidate. Never guesses.
pub fn expect_unique<T>(
    kind: &str,
    name: &str,
    mut matches: Vec<T>,
    identity: impl Fn(&T) -> String,
) -> Result<Option<T>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        _ => Err(Error::ambiguous(
            kind,
            name,
            matches.iter().map(identity).collect(),
        )),
    }
}

/// Reduce a search result to exactly one record
pub fn expect_one<T>(
    kind: &str,
    name: &str,
    matches: Vec<T>,
    identity: impl Fn(&T) -> String,
) -> Result<T> {
    expect_unique(kind, name, matches, identity)?.ok_or_else(|| Error::not_found(kind, name))
}
