//! Errors surfaced to the caller of a run.

use crate::report::RunReport;
use nodeflow_core::{NodeFailure, NodeName};
use thiserror::Error;

/// Errors returned when building or running a process.
///
/// # Non-Exhaustive
///
/// New variants may be added; include a wildcard arm when matching:
///
/// ```
/// use nodeflow::ProcessError;
///
/// fn describe(error: &ProcessError) -> String {
///     match error {
///         ProcessError::Interrupted { node_name, failure, .. } => {
///             format!("{} stopped the run: {}", node_name, failure)
///         }
///         ProcessError::NodeNotFound(name) => format!("unknown node {}", name),
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProcessError {
    /// A node whose fail handle is `Interrupt` failed.
    ///
    /// Carries the originating failure and the outcomes recorded so far.
    #[error("Node '{node_name}' interrupted chain '{chain_name}': {failure}")]
    Interrupted {
        /// Name of the chain or topology.
        chain_name: String,
        /// The failing node.
        node_name: NodeName,
        /// The classified failure.
        failure: NodeFailure,
        /// Partial report, including the nodes that never started.
        report: Box<RunReport>,
    },

    /// A dependency names a node that was never added.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeName),

    /// Two nodes share a name.
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeName),

    /// The dependency graph has a cycle through the named node.
    #[error("Cyclic dependency detected at node: {0}")]
    CyclicDependency(NodeName),

    /// The process configuration is invalid.
    #[error("Invalid process configuration: {0}")]
    Configuration(String),
}

impl ProcessError {
    /// Returns the node failure behind an interrupted run.
    pub fn failure(&self) -> Option<&NodeFailure> {
        match self {
            ProcessError::Interrupted { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Returns the partial report of an interrupted run.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            ProcessError::Interrupted { report, .. } => Some(&**report),
            _ => None,
        }
    }
}
