//! Error types for reconciliation.
//!
//! Every error here is raised before any remote mutation is attempted:
//! expansion, matching and planning fail fast on the caller's input.

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pure reconciliation components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A `[start:end]` range token with `start > end`.
    #[error("invalid range in '{spec}': start {start} is greater than end {end}")]
    InvalidRange {
        /// The offending specification.
        spec: String,
        /// Range start.
        start: u64,
        /// Range end.
        end: u64,
    },

    /// Malformed specification or conflicting inputs.
    #[error("invalid specification '{spec}': {message}")]
    Validation {
        /// The offending specification or input name.
        spec: String,
        /// What is wrong with it.
        message: String,
    },

    /// More than one record matched where exactly one was required.
    #[error("ambiguous {kind} '{name}': {} matches ({})", .candidates.len(), .candidates.join(", "))]
    AmbiguousMatch {
        /// Kind of record searched for (group, device, image set).
        kind: String,
        /// The name that was searched.
        name: String,
        /// Identities of every match.
        candidates: Vec<String>,
    },

    /// Zero records matched where at least one was required.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Kind of record searched for.
        kind: String,
        /// The name (or names) that did not resolve.
        name: String,
    },

    /// Targets span more than one partition where a single one is required.
    #[error("targets span {} partitions ({}), expected exactly one", .keys.len(), .keys.join(", "))]
    MixedPartitions {
        /// Every partition key seen among the targets.
        keys: Vec<String>,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            spec: spec.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an ambiguous-match error.
    pub fn ambiguous(
        kind: impl Into<String>,
        name: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self::AmbiguousMatch {
            kind: kind.into(),
            name: name.into(),
            candidates,
        }
    }
}
