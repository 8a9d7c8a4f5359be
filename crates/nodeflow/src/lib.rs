//! A node-based process engine.
//!
//! A process is a fixed set of [`Node`]s run over one shared [`Context`] per
//! run. Nodes run either as a chain, strictly in order, or as a topology,
//! where nodes wait only for their declared dependencies and independent
//! nodes run concurrently.
//!
//! Every node execution is bounded by the node's timeout, and every failure
//! is classified as business, timeout or unknown, logged, and handed to the
//! matching hook. The node's [`FailHandle`] then decides whether the run is
//! interrupted or carries on.
//!
//! # Example
//!
//! ```rust
//! use nodeflow::prelude::*;
//! use async_trait::async_trait;
//! use serde::Serialize;
//!
//! #[derive(Debug, Default, Serialize)]
//! struct Order {
//!     req: String,
//!     a: Option<String>,
//! }
//!
//! struct GetAByReq;
//!
//! #[async_trait]
//! impl Node<Order> for GetAByReq {
//!     async fn process(
//!         &self,
//!         ctx: &Context<Order>,
//!         _cancel: &CancellationToken,
//!     ) -> Result<(), NodeError> {
//!         let mut order = ctx.write().await;
//!         if order.req == "req" {
//!             order.a = Some("A".to_string());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ProcessError> {
//! let chain = Dispatcher::chain("order")
//!     .with_config(EngineConfig::from_env())
//!     .add(GetAByReq)
//!     .build()?;
//!
//! let ctx = Context::new(Order {
//!     req: "req".to_string(),
//!     ..Order::default()
//! });
//! let report = chain.run(&ctx).await?;
//!
//! assert!(report.is_success());
//! assert_eq!(ctx.read().await.a.as_deref(), Some("A"));
//! # Ok(())
//! # }
//! ```
//!
//! # Failure handling
//!
//! ```rust
//! use nodeflow::prelude::*;
//!
//! fn explain(result: Result<RunReport, ProcessError>) {
//!     match result {
//!         Ok(report) => {
//!             for record in report.failures() {
//!                 eprintln!("{} bypassed with {}", record.node_name, record.outcome);
//!             }
//!         }
//!         Err(ProcessError::Interrupted { node_name, failure, .. }) => match failure {
//!             NodeFailure::Business(e) => eprintln!("{} refused: {}", node_name, e.msg),
//!             NodeFailure::Timeout { timeout } => {
//!                 eprintln!("{} took longer than {:?}", node_name, timeout)
//!             }
//!             other => eprintln!("{} failed: {}", node_name, other),
//!         },
//!         Err(other) => eprintln!("invalid process: {}", other),
//!     }
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod execute;
mod policy;
mod report;
mod timeout;

// Re-export core types
pub use nodeflow_core::*;

pub use config::{EngineConfig, LOG_LEVEL_ENV, MAX_PARALLEL_ENV};
pub use dispatcher::{ChainBuilder, DispatchMode, Dispatcher, TopologyBuilder};
pub use error::ProcessError;
pub use policy::{decide, PolicyDecision};
pub use report::{NodeRecord, RunReport};
pub use timeout::{Supervised, TimeoutSupervisor};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        business_fail, BusinessError, CancellationToken, ChainBuilder, Context, Dispatcher,
        EngineConfig, ExecutionOutcome, FailHandle, LogLevel, Node, NodeConfig, NodeError,
        NodeFailure, NodeName, NodeTimeout, ProcessError, RunReport, TopologyBuilder,
    };
}
