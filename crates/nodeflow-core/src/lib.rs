//! Core traits and types for the nodeflow process engine.
//!
//! Node authors depend on this crate; the engine itself lives in `nodeflow`.
//!
//! # Core Types
//!
//! - [`Node`] - A reusable unit of work with skip, process and failure hooks
//! - [`Context`] - The per-run payload plus the run id used in logs
//! - [`NodeConfig`] - Per-node failure handling and time budget
//! - [`NodeError`] / [`business_fail`] - How `process` reports failures
//! - [`NodeFailure`] - A classified failure (business, timeout, unknown)
//! - [`LogLevel`] / [`NodeLog`] - Verbosity and the per-execution log line

mod context;
mod error;
mod log;
mod node;
mod outcome;

pub use context::Context;
pub use error::{business_fail, BusinessError, NodeError, NodeFailure};
pub use log::{LogLevel, NodeLog, NODE_LOG};
pub use node::{Node, NodeConfig, NodeName, NodeTimeout};
pub use outcome::{ExecutionOutcome, FailHandle, FailureKind};

pub use tokio_util::sync::CancellationToken;
