//! # Reconcile
//!
//! Pure building blocks for idempotent reconciliation against a remote
//! inventory. Nothing in this crate performs I/O.
//!
//! ## Core Concepts
//!
//! - **TargetSpec**: a declarative name specification (literal, `[a:b]` range
//!   or `*` wildcard), parsed once and expanded or matched on demand
//! - **SetDiff**: the minimal additions/removals between desired and observed
//!   identity sets
//! - **BatchPlan**: targets grouped by partition key, one mutation request per
//!   partition
//! - **Report**: what a run changed, and whether the change was verified
//!
//! ## Example
//!
//! ```
//! use reconcile::{BatchPlan, SetDiff, TargetSpec};
//! use std::collections::BTreeSet;
//!
//! let names = TargetSpec::parse("edge[1:3]").unwrap().expand().unwrap();
//! let desired: BTreeSet<String> = names.into_iter().collect();
//! let observed: BTreeSet<String> = ["edge2".to_string()].into_iter().collect();
//!
//! let diff = SetDiff::compute(&desired, &observed).additions_only();
//! assert_eq!(diff.to_add.len(), 2);
//!
//! let plan = BatchPlan::build(vec![(1, "a"), (2, "b"), (3, "a")], |t| t.0, |t| t.1);
//! assert_eq!(plan.keys(), vec!["a", "b"]);
//! ```

pub mod diff;
pub mod error;
pub mod ipv4;
pub mod pattern;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use diff::{DiffSummary, SetDiff, expect_one, expect_unique, reconcile};
pub use error::{Error, Result};
pub use ipv4::Ipv4Pattern;
pub use pattern::{MAX_EXPANSION, TargetSpec, expand_all, parse_all};
pub use planner::{Batch, BatchPlan, single_partition};
pub use types::{
    ApplyResult, ExecuteOptions, ExecuteSummary, ItemResult, Phase, Report, Verification,
};
