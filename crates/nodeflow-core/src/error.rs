//! Node failure types.

use crate::outcome::{ExecutionOutcome, FailureKind};
use std::time::Duration;
use thiserror::Error;

/// An expected domain failure raised by node logic.
///
/// This is the sanctioned way for a node to report that a business rule was
/// violated, as opposed to a bug or an unavailable dependency.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("business failure code={code} msg={msg}")]
pub struct BusinessError {
    /// Domain-specific failure code.
    pub code: i32,
    /// Human readable message.
    pub msg: String,
}

impl BusinessError {
    /// Creates a new business error.
    pub fn new(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }
}

/// Returns a business failure from the calling node.
///
/// # Examples
///
/// ```
/// use nodeflow_core::{business_fail, NodeError};
///
/// fn check_stock(stock: u32) -> Result<(), NodeError> {
///     if stock == 0 {
///         return business_fail(4001, "out of stock");
///     }
///     Ok(())
/// }
///
/// assert!(matches!(check_stock(0), Err(NodeError::Business(e)) if e.code == 4001));
/// assert!(check_stock(3).is_ok());
/// ```
pub fn business_fail<R>(code: i32, msg: impl Into<String>) -> Result<R, NodeError> {
    Err(NodeError::Business(BusinessError::new(code, msg)))
}

/// Error returned by [`Node::process`](crate::Node::process).
#[derive(Error, Debug)]
pub enum NodeError {
    /// An expected domain failure.
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// Anything else: a bug, an I/O error, a failed downstream call.
    #[error(transparent)]
    Unknown(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl NodeError {
    /// Wraps an arbitrary error as an unknown failure.
    pub fn unknown(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Unknown(error.into())
    }
}

/// A classified node failure, as seen by hooks, policy and the run's caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NodeFailure {
    /// The node raised a [`BusinessError`].
    #[error(transparent)]
    Business(BusinessError),

    /// The node did not finish within its time budget.
    #[error("timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// Any other fault, including panics.
    #[error("{details}")]
    Unknown {
        /// Rendered error or panic message.
        details: String,
    },
}

impl NodeFailure {
    /// Returns the failure classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            NodeFailure::Business(_) => FailureKind::Business,
            NodeFailure::Timeout { .. } => FailureKind::Timeout,
            NodeFailure::Unknown { .. } => FailureKind::Unknown,
        }
    }

    /// Returns the terminal outcome this failure maps to.
    pub fn outcome(&self) -> ExecutionOutcome {
        match self.kind() {
            FailureKind::Business => ExecutionOutcome::BusinessFailed,
            FailureKind::Timeout => ExecutionOutcome::TimeoutFailed,
            FailureKind::Unknown => ExecutionOutcome::UnknownFailed,
        }
    }
}

impl From<NodeError> for NodeFailure {
    fn from(error: NodeError) -> Self {
        match error {
            NodeError::Business(e) => NodeFailure::Business(e),
            NodeError::Unknown(e) => NodeFailure::Unknown {
                details: format_error_chain(e.as_ref()),
            },
        }
    }
}

/// Renders an error and its sources, outermost first.
fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut details = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        details.push_str(": caused by: ");
        details.push_str(&cause.to_string());
        source = cause.source();
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("query failed")]
    struct QueryError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_business_error_display() {
        let error = BusinessError::new(1001, "insufficient balance");
        assert_eq!(
            error.to_string(),
            "business failure code=1001 msg=insufficient balance"
        );
    }

    #[test]
    fn test_business_fail_helper() {
        let result: Result<(), NodeError> = business_fail(7, "nope");
        match result {
            Err(NodeError::Business(e)) => {
                assert_eq!(e.code, 7);
                assert_eq!(e.msg, "nope");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_failure_classification() {
        let business: NodeFailure = NodeError::from(BusinessError::new(1, "x")).into();
        assert_eq!(business.kind(), FailureKind::Business);
        assert_eq!(business.outcome(), ExecutionOutcome::BusinessFailed);

        let timeout = NodeFailure::Timeout {
            timeout: Duration::from_millis(100),
        };
        assert_eq!(timeout.kind(), FailureKind::Timeout);
        assert_eq!(timeout.to_string(), "timed out after 100ms");

        let unknown: NodeFailure = NodeError::unknown("boom").into();
        assert_eq!(unknown.outcome(), ExecutionOutcome::UnknownFailed);
        assert_eq!(unknown.to_string(), "boom");
    }

    #[test]
    fn test_unknown_failure_keeps_source_chain() {
        let error = QueryError {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket closed"),
        };
        let failure: NodeFailure = NodeError::unknown(error).into();
        assert_eq!(
            failure,
            NodeFailure::Unknown {
                details: "query failed: caused by: socket closed".to_string()
            }
        );
    }
}
