//! Failure policy: whether a node outcome stops the run.

use nodeflow_core::{ExecutionOutcome, FailHandle};

/// Decision taken after a node reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Keep scheduling the remaining nodes.
    Proceed,
    /// Start no further node and surface the failure to the caller.
    Interrupt,
}

/// Applies a node's [`FailHandle`] to its outcome.
///
/// Successful and skipped nodes always proceed. Failures interrupt or are
/// bypassed according to the node's own handle, independent of the failure
/// kind.
///
/// # Examples
///
/// ```
/// use nodeflow::{decide, PolicyDecision};
/// use nodeflow::{ExecutionOutcome, FailHandle};
///
/// assert_eq!(
///     decide(FailHandle::Interrupt, ExecutionOutcome::TimeoutFailed),
///     PolicyDecision::Interrupt
/// );
/// assert_eq!(
///     decide(FailHandle::Continue, ExecutionOutcome::UnknownFailed),
///     PolicyDecision::Proceed
/// );
/// ```
pub fn decide(fail_handle: FailHandle, outcome: ExecutionOutcome) -> PolicyDecision {
    if outcome.is_ok() {
        return PolicyDecision::Proceed;
    }
    match fail_handle {
        FailHandle::Interrupt => PolicyDecision::Interrupt,
        FailHandle::Continue => PolicyDecision::Proceed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILURES: [ExecutionOutcome; 3] = [
        ExecutionOutcome::BusinessFailed,
        ExecutionOutcome::TimeoutFailed,
        ExecutionOutcome::UnknownFailed,
    ];

    #[test]
    fn test_success_never_interrupts() {
        for handle in [FailHandle::Interrupt, FailHandle::Continue] {
            assert_eq!(decide(handle, ExecutionOutcome::Success), PolicyDecision::Proceed);
            assert_eq!(decide(handle, ExecutionOutcome::Skipped), PolicyDecision::Proceed);
        }
    }

    #[test]
    fn test_failure_kinds_share_policy() {
        for outcome in FAILURES {
            assert_eq!(decide(FailHandle::Interrupt, outcome), PolicyDecision::Interrupt);
            assert_eq!(decide(FailHandle::Continue, outcome), PolicyDecision::Proceed);
        }
    }
}
