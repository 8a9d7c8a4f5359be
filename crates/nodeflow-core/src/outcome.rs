//! Per-node outcomes and failure handling modes.

use std::fmt;

/// Terminal result of one node execution within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionOutcome {
    /// `process` returned normally.
    Success,
    /// `is_skip` returned `true`; `process` was not invoked.
    Skipped,
    /// The node raised a business failure.
    BusinessFailed,
    /// The node exceeded its time budget.
    TimeoutFailed,
    /// The node failed in any other way.
    UnknownFailed,
}

impl ExecutionOutcome {
    /// Returns `true` for [`Success`](Self::Success) and [`Skipped`](Self::Skipped).
    pub fn is_ok(self) -> bool {
        matches!(self, ExecutionOutcome::Success | ExecutionOutcome::Skipped)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionOutcome::Success => "SUCCESS",
            ExecutionOutcome::Skipped => "SKIPPED",
            ExecutionOutcome::BusinessFailed => "BUSINESS_FAILED",
            ExecutionOutcome::TimeoutFailed => "TIMEOUT_FAILED",
            ExecutionOutcome::UnknownFailed => "UNKNOWN_FAILED",
        };
        f.write_str(s)
    }
}

/// Classification of a node failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Expected domain violation.
    Business,
    /// Time budget exceeded.
    Timeout,
    /// Any other fault.
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Business => write!(f, "business"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// What a node failure does to the rest of the run.
///
/// The integer codes match the values accepted by [`FailHandle::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailHandle {
    /// Abort the run and surface the failure to the caller.
    #[default]
    Interrupt = 1,
    /// Record the failure and keep scheduling the remaining nodes.
    Continue = 2,
}

impl FailHandle {
    /// Parses an integer code, falling back to [`FailHandle::Interrupt`].
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => FailHandle::Continue,
            _ => FailHandle::Interrupt,
        }
    }

    /// Returns the integer code.
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for FailHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailHandle::Interrupt => write!(f, "INTERRUPT"),
            FailHandle::Continue => write!(f, "CONTINUE"),
        }
    }
}
