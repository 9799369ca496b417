//! Reconciliation engine for edgectl
//!
//! Every mutating operation runs the same state machine:
//! 1. Expand - parse target specifications into names
//! 2. Fetch - cold read of the remote state
//! 3. Diff - desired against observed, by stable identity
//! 4. Plan - one request per partition
//! 5. Execute - sequential mutations, failures collected per partition
//! 6. Verify - bounded read-back, tolerant of eventual consistency
//! 7. Report - what changed

pub mod groups;
pub mod images;
pub mod inventory;
pub mod members;
pub mod repos;
pub mod updates;

#[cfg(test)]
pub mod fake;

use edgeapi::EdgeClient;
use reconcile::{ExecuteOptions, Phase, Verification};
use std::fmt;
use std::thread;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// One partition whose mutation failed
#[derive(Debug)]
pub struct BatchFailure {
    /// Partition key (image set, group name, device ID)
    pub key: String,
    pub error: edgeapi::Error,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

/// Errors from a reconciliation run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad specification or conflicting inputs; nothing was sent
    #[error(transparent)]
    Spec(#[from] reconcile::Error),

    /// Remote lookup or mutation failed
    #[error(transparent)]
    Api(#[from] edgeapi::Error),

    /// Some partitions were applied, others failed
    #[error(
        "{} of {} partitions failed ({})",
        .failed.len(),
        partition_count(.succeeded, .failed),
        join_failures(.failed)
    )]
    PartialBatchFailure {
        succeeded: Vec<String>,
        failed: Vec<BatchFailure>,
    },

    /// Every partition failed and there was more than one
    #[error("all {} partitions failed ({})", .failed.len(), join_failures(.failed))]
    AllBatchesFailed { failed: Vec<BatchFailure> },
}

fn partition_count(succeeded: &[String], failed: &[BatchFailure]) -> usize {
    succeeded.len() + failed.len()
}

fn join_failures(failed: &[BatchFailure]) -> String {
    failed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Turn collected per-partition outcomes into a result
///
/// No failures is success. A single partition failing on its own surfaces
/// its own error. Partial failure is reserved for runs where at least one
/// partition was applied.
pub(crate) fn settle(succeeded: Vec<String>, mut failed: Vec<BatchFailure>) -> Result<()> {
    match (succeeded.is_empty(), failed.len()) {
        (_, 0) => Ok(()),
        (true, 1) => Err(Error::Api(failed.remove(0).error)),
        (true, _) => Err(Error::AllBatchesFailed { failed }),
        (false, _) => Err(Error::PartialBatchFailure { succeeded, failed }),
    }
}

/// Shared state for one invocation: a client and the run options
pub struct Engine<'a> {
    client: EdgeClient<'a>,
    options: ExecuteOptions,
}

impl<'a> Engine<'a> {
    pub fn new(client: EdgeClient<'a>, options: ExecuteOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &EdgeClient<'a> {
        &self.client
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub(crate) fn phase(&self, phase: Phase, what: &str) {
        log::debug!("[{phase}] {what}");
    }

    /// Poll until `still_pending` reports nothing left, or give up
    ///
    /// `still_pending` receives the names not yet observed and returns the
    /// subset that is still missing. Giving up is reported as
    /// [`Verification::Unconfirmed`], never as an error.
    pub(crate) fn verify<F>(&self, pending: Vec<String>, mut still_pending: F) -> Result<Verification>
    where
        F: FnMut(&[String]) -> Result<Vec<String>>,
    {
        if self.options.dry_run {
            return Ok(Verification::Skipped);
        }
        if pending.is_empty() {
            return Ok(Verification::NotNeeded);
        }
        self.phase(Phase::Verify, &format!("{} pending", pending.len()));

        let mut pending = pending;
        for attempt in 1..=self.options.verify_attempts {
            pending = still_pending(&pending)?;
            if pending.is_empty() {
                return Ok(Verification::Confirmed);
            }
            if attempt < self.options.verify_attempts {
                log::debug!(
                    "verify attempt {attempt}/{}: {} pending",
                    self.options.verify_attempts,
                    pending.len()
                );
                thread::sleep(self.options.verify_interval);
            }
        }

        log::warn!(
            "not yet visible after {} reads: {}",
            self.options.verify_attempts,
            pending.join(", ")
        );
        Ok(Verification::Unconfirmed { pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeapi::MockGateway;
    use std::cell::Cell;
    use std::time::Duration;

    fn options(attempts: u32) -> ExecuteOptions {
        ExecuteOptions {
            dry_run: false,
            verify_attempts: attempts,
            verify_interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_verify_confirms_once_visible() {
        let mock = MockGateway::new();
        let engine = Engine::new(EdgeClient::new(&mock), options(3));
        let reads = Cell::new(0);

        let verification = engine
            .verify(vec!["a".into(), "b".into()], |pending| {
                reads.set(reads.get() + 1);
                // "a" shows up on the first read, "b" on the second
                Ok(pending
                    .iter()
                    .filter(|n| reads.get() < 2 && n.as_str() == "b")
                    .cloned()
                    .collect())
            })
            .unwrap();
        assert_eq!(verification, Verification::Confirmed);
        assert_eq!(reads.get(), 2);
    }

    #[test]
    fn test_verify_gives_up_without_failing() {
        let mock = MockGateway::new();
        let engine = Engine::new(EdgeClient::new(&mock), options(2));
        let verification = engine
            .verify(vec!["slow".into()], |pending| Ok(pending.to_vec()))
            .unwrap();
        assert_eq!(
            verification,
            Verification::Unconfirmed {
                pending: vec!["slow".into()]
            }
        );
    }

    #[test]
    fn test_settle() {
        assert!(settle(vec!["a".into()], Vec::new()).is_ok());

        let single = settle(
            Vec::new(),
            vec![BatchFailure {
                key: "1".into(),
                error: edgeapi::Error::remote("POST", "/u", 500, "x"),
            }],
        );
        assert!(matches!(single, Err(Error::Api(_))));

        let partial = settle(
            vec!["1".into()],
            vec![BatchFailure {
                key: "2".into(),
                error: edgeapi::Error::remote("POST", "/u", 400, "bad"),
            }],
        )
        .unwrap_err();
        let message = partial.to_string();
        assert!(message.contains("1 of 2 partitions failed"));
        assert!(message.contains("2: "));
    }

    #[test]
    fn test_settle_all_failed_is_not_partial() {
        let failure = |key: &str| BatchFailure {
            key: key.into(),
            error: edgeapi::Error::remote("POST", "/u", 500, "down"),
        };
        let err = settle(Vec::new(), vec![failure("1"), failure("2")]).unwrap_err();
        match &err {
            Error::AllBatchesFailed { failed } => {
                let keys: Vec<&str> = failed.iter().map(|f| f.key.as_str()).collect();
                assert_eq!(keys, ["1", "2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("all 2 partitions failed"));
    }
}
