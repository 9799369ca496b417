//! Error types for edge API operations.
//!
//! Errors are categorized so callers can decide whether a narrow retry makes
//! sense and what to tell the user.

use std::fmt;

/// Result type alias for edge API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure before a status was received (transient, retryable).
    Network,
    /// The service answered with a non-success status.
    Remote,
    /// A lookup matched nothing.
    NotFound,
    /// A lookup matched more than one record.
    Ambiguous,
    /// The response could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Remote => "Request rejected by the service",
            Self::NotFound => "Record not found",
            Self::Ambiguous => "More than one record matched",
            Self::Format => "Unexpected response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your connection and the configured server, then try again",
            Self::Remote => "Check the status and response body; verify your token and permissions",
            Self::NotFound => "Verify the name or ID is correct",
            Self::Ambiguous => "Use a more specific name or the record ID",
            Self::Format => "The service may have changed its API; check for an edgectl update",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the edge services.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure (DNS, TLS, connection reset, timeout).
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Non-2xx response.
    #[error("[{method}] {path} failed with HTTP {status}: {body}")]
    Remote {
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Response body was not the expected shape.
    #[error("invalid response from {path}: {message}")]
    InvalidResponse {
        /// Request path.
        path: String,
        /// What was wrong.
        message: String,
    },

    /// A lookup matched nothing.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Kind of record.
        kind: String,
        /// Name or ID searched for.
        name: String,
    },

    /// A lookup matched more than one record.
    #[error("ambiguous {kind} '{name}': matched {}", .candidates.join(", "))]
    AmbiguousMatch {
        /// Kind of record.
        kind: String,
        /// Name searched for.
        name: String,
        /// Every match.
        candidates: Vec<String>,
    },

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a remote (non-2xx) error.
    pub fn remote(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Remote {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an invalid-response error.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            path: path.into(),
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

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::Remote { status, .. } if *status == 404 => ErrorCategory::NotFound,
            Error::Remote { status, .. } if *status >= 500 => ErrorCategory::Network,
            Error::Remote { .. } => ErrorCategory::Remote,
            Error::InvalidResponse { .. } => ErrorCategory::Format,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AmbiguousMatch { .. } => ErrorCategory::Ambiguous,
            Error::Config(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// HTTP status of a remote error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Remote {
                method: String::new(),
                path: String::new(),
                status: code,
                body: String::new(),
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<reconcile::Error> for Error {
    fn from(err: reconcile::Error) -> Self {
        match err {
            reconcile::Error::NotFound { kind, name } => Self::NotFound { kind, name },
            reconcile::Error::AmbiguousMatch {
                kind,
                name,
                candidates,
            } => Self::AmbiguousMatch {
                kind,
                name,
                candidates,
            },
            other => Self::Config(other.to_string()),
        }
    }
}
