//! Aggregate result of a run.

use nodeflow_core::{ExecutionOutcome, NodeName};
use std::time::Duration;

/// What happened to one node in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// The node's name.
    pub node_name: NodeName,
    /// Terminal outcome.
    pub outcome: ExecutionOutcome,
    /// Time from `before_log` to the outcome.
    pub elapsed: Duration,
    /// The structured log line, when the node succeeded and logging is on.
    pub log_line: Option<String>,
}

/// Outcomes of every node a run executed, in completion order.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run id of the context the run executed against.
    pub run_id: String,
    /// Name of the chain or topology.
    pub chain_name: String,
    /// One record per executed node.
    pub records: Vec<NodeRecord>,
    /// Nodes that never started because an earlier failure interrupted the run.
    pub aborted: Vec<NodeName>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns the record of the named node, if it executed.
    pub fn record(&self, node_name: &str) -> Option<&NodeRecord> {
        self.records
            .iter()
            .find(|r| r.node_name.as_str() == node_name)
    }

    /// Returns the outcome of the named node, if it executed.
    pub fn outcome(&self, node_name: &str) -> Option<ExecutionOutcome> {
        self.record(node_name).map(|r| r.outcome)
    }

    /// Returns `true` if every node ran and none failed.
    pub fn is_success(&self) -> bool {
        self.aborted.is_empty() && self.records.iter().all(|r| r.outcome.is_ok())
    }

    /// Returns the records of failed nodes.
    pub fn failures(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter().filter(|r| !r.outcome.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, outcome: ExecutionOutcome) -> NodeRecord {
        NodeRecord {
            node_name: NodeName::new(name),
            outcome,
            elapsed: Duration::ZERO,
            log_line: None,
        }
    }

    #[test]
    fn test_report_queries() {
        let report = RunReport {
            run_id: "run-1".to_string(),
            chain_name: "orders".to_string(),
            records: vec![
                record("A", ExecutionOutcome::Success),
                record("B", ExecutionOutcome::UnknownFailed),
                record("C", ExecutionOutcome::Skipped),
            ],
            aborted: Vec::new(),
            elapsed: Duration::ZERO,
        };

        assert_eq!(report.outcome("B"), Some(ExecutionOutcome::UnknownFailed));
        assert_eq!(report.outcome("D"), None);
        assert!(!report.is_success());
        let failed: Vec<_> = report.failures().map(|r| r.node_name.as_str()).collect();
        assert_eq!(failed, vec!["B"]);
    }

    #[test]
    fn test_aborted_run_is_not_success() {
        let report = RunReport {
            run_id: "run-1".to_string(),
            chain_name: "orders".to_string(),
            records: vec![record("A", ExecutionOutcome::Success)],
            aborted: vec![NodeName::new("B")],
            elapsed: Duration::ZERO,
        };
        assert!(!report.is_success());
    }
}
