//! Error types for manifest reconciliation.
//!
//! Every failure surfaces unchanged to the caller; nothing in this crate
//! retries or rolls back. Errors are grouped into categories so a host can
//! give the user actionable feedback.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Name of the annotation kubectl writes on every applied object.
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// kubectl ran and reported a failure
    Tool,
    /// kubectl could not be located or started, or timed out
    Environment,
    /// The tracked identity is missing or unusable
    Identity,
    /// The live object did not have the expected structure
    Shape,
    /// A manifest or tool response could not be parsed
    Parse,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Tool => "kubectl reported an error",
            Self::Environment => "kubectl could not be run",
            Self::Identity => "Resource identity problem",
            Self::Shape => "Unexpected object structure",
            Self::Parse => "Malformed document",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Tool => "Inspect the kubectl output above and fix the manifest or cluster access",
            Self::Environment => "Check that kubectl is installed and on PATH, or pass --kubectl",
            Self::Identity => {
                "The object may be applied but untracked; re-import it by self-link"
            }
            Self::Shape => "The object was not applied with kubectl apply; re-apply it",
            Self::Parse => "Validate the manifest as YAML or JSON",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Structural problems found while walking a live object's metadata.
///
/// Each step of the walk has its own variant so the caller can tell which
/// level was missing. `observed` holds the structure seen at that level.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// The object has no `metadata`
    #[error("object's metadata couldn't be found in: {observed}")]
    MetadataMissing {
        /// The whole object
        observed: String,
    },

    /// `metadata` is not a mapping
    #[error("object's metadata wasn't of the expected type: {observed}")]
    MetadataType {
        /// The `metadata` value
        observed: String,
    },

    /// `metadata` has no `annotations`
    #[error("object's annotations couldn't be found in: {observed}")]
    AnnotationsMissing {
        /// The `metadata` mapping
        observed: String,
    },

    /// `annotations` is not a mapping
    #[error("object's annotations wasn't of the expected type: {observed}")]
    AnnotationsType {
        /// The `annotations` value
        observed: String,
    },

    /// The last-applied annotation is absent
    #[error("object's '{key}' annotation couldn't be found in: {observed}")]
    AnnotationMissing {
        /// Annotation that was looked up
        key: String,
        /// The `annotations` mapping
        observed: String,
    },

    /// The last-applied annotation is not a string
    #[error("annotation '{key}' was of an unexpected type: {observed}")]
    AnnotationType {
        /// Annotation that was looked up
        key: String,
        /// The annotation's value
        observed: String,
    },
}

/// Errors that can occur while reconciling a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not valid YAML/JSON, or holds a value JSON cannot carry
    #[error("invalid document: {message}")]
    Parse {
        /// Parser diagnostic
        message: String,
    },

    /// kubectl exited with a non-zero status
    #[error("{command}: {status}{}", stderr_suffix(.stderr))]
    Tool {
        /// Full command line that was invoked
        command: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// kubectl could not be started
    #[error("{command}: {source}")]
    Spawn {
        /// Full command line that was attempted
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// kubectl is not on PATH
    #[error("kubectl not found in PATH")]
    ToolNotFound,

    /// kubectl did not finish before the configured deadline
    #[error("{command}: timed out after {}s", .timeout.as_secs_f64())]
    Timeout {
        /// Full command line that was invoked
        command: String,
        /// Deadline that expired
        timeout: Duration,
    },

    /// The post-create fetch did not return the expected JSON
    #[error("decoding response: {source}")]
    Decode {
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The post-create fetch matched a number of objects other than one
    #[error("expected to create 1 resource, got {count}")]
    Cardinality {
        /// Number of objects returned
        count: usize,
    },

    /// The created object carries no self-link
    #[error("could not parse self-link from response {response}")]
    IdentityMissing {
        /// Raw kubectl response
        response: String,
    },

    /// The stored identity is absent or cannot be decoded
    #[error("invalid resource id: {id}")]
    InvalidIdentity {
        /// The stored identity, empty if there was none
        id: String,
    },

    /// The live object did not have the expected metadata structure
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl From<yaml_rust2::scanner::ScanError> for Error {
    fn from(err: yaml_rust2::scanner::ScanError) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Tool { .. } => ErrorCategory::Tool,
            Error::Spawn { .. } | Error::ToolNotFound | Error::Timeout { .. } => {
                ErrorCategory::Environment
            }
            Error::Cardinality { .. }
            | Error::IdentityMissing { .. }
            | Error::InvalidIdentity { .. } => ErrorCategory::Identity,
            Error::Shape(_) => ErrorCategory::Shape,
            Error::Parse { .. } | Error::Decode { .. } => ErrorCategory::Parse,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
