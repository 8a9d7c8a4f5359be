//! Node trait and related types.

use crate::context::Context;
use crate::error::{BusinessError, NodeError, NodeFailure};
use crate::outcome::FailHandle;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Name a node is registered, referenced and logged under.
///
/// Unique within a dispatcher. Dependencies in a topology name it, and it is
/// the `nodeName=` value of the node's log lines.
///
/// # Examples
///
/// ```
/// use nodeflow_core::NodeName;
///
/// let name = NodeName::new("GetAByReq");
/// assert_eq!(name.as_str(), "GetAByReq");
///
/// let name: NodeName = "GetBByA".into();
/// assert_eq!(name.to_string(), "GetBByA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeName(String);

impl NodeName {
    /// Creates a new NodeName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a NodeName from a type's name (extracts last path segment).
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let base = full_name.split('<').next().unwrap_or(full_name);
        let short_name = base.rsplit("::").next().unwrap_or("UnknownNode");
        Self::new(short_name)
    }

    /// Returns the node name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Named timeout presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeTimeout {
    /// 1 second.
    Short,
    /// 3 seconds, the default for every node.
    #[default]
    Commonly,
    /// 10 seconds.
    Long,
}

impl NodeTimeout {
    /// Returns the preset in milliseconds.
    pub fn millis(self) -> u64 {
        match self {
            NodeTimeout::Short => 1_000,
            NodeTimeout::Commonly => 3_000,
            NodeTimeout::Long => 10_000,
        }
    }

    /// Returns the preset as a [`Duration`].
    pub fn duration(self) -> Duration {
        Duration::from_millis(self.millis())
    }
}

impl From<NodeTimeout> for Duration {
    fn from(timeout: NodeTimeout) -> Self {
        timeout.duration()
    }
}

/// Failure handling and time budget of a node.
///
/// # Examples
///
/// ```
/// use nodeflow_core::{FailHandle, NodeConfig, NodeTimeout};
/// use std::time::Duration;
///
/// let config = NodeConfig::default();
/// assert_eq!(config.fail_handle, FailHandle::Interrupt);
/// assert_eq!(config.timeout, NodeTimeout::Commonly.duration());
///
/// let config = NodeConfig::default()
///     .with_fail_handle(FailHandle::Continue)
///     .with_timeout(Duration::from_millis(100));
/// assert_eq!(config.timeout, Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// What a failure of this node does to the run. Default: interrupt.
    pub fail_handle: FailHandle,
    /// Time budget for `is_skip` plus `process`. Default: [`NodeTimeout::Commonly`].
    pub timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            fail_handle: FailHandle::Interrupt,
            timeout: NodeTimeout::Commonly.duration(),
        }
    }
}

impl NodeConfig {
    /// Sets the failure handling mode.
    pub fn with_fail_handle(mut self, fail_handle: FailHandle) -> Self {
        self.fail_handle = fail_handle;
        self
    }

    /// Sets the time budget.
    pub fn with_timeout(mut self, timeout: impl Into<Duration>) -> Self {
        self.timeout = timeout.into();
        self
    }
}

/// A reusable unit of work in a process.
///
/// A node is built once and executed by many runs, possibly at the same time,
/// so it must not keep per-run state: everything a run produces belongs in
/// the [`Context`].
///
/// # Cancellation
///
/// `process` receives a token that is cancelled when the node exceeds its
/// time budget. The engine reports the timeout immediately and does not wait
/// for the attempt to stop. A node that never checks the token keeps running
/// in the background and may still write to the context after its run has
/// moved on.
///
/// # Examples
///
/// ```
/// use nodeflow_core::{business_fail, Context, Node, NodeError};
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug, Default)]
/// struct Order {
///     amount: u64,
///     approved: bool,
/// }
///
/// struct ApproveOrder;
///
/// #[async_trait]
/// impl Node<Order> for ApproveOrder {
///     async fn process(
///         &self,
///         ctx: &Context<Order>,
///         _cancel: &CancellationToken,
///     ) -> Result<(), NodeError> {
///         let mut order = ctx.write().await;
///         if order.amount > 10_000 {
///             return business_fail(4003, "amount exceeds approval limit");
///         }
///         order.approved = true;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Node<T: Send + Sync>: Send + Sync {
    /// Runs the node's business logic against the context.
    async fn process(&self, ctx: &Context<T>, cancel: &CancellationToken)
        -> Result<(), NodeError>;

    /// Returns the node name. Defaults to the type name.
    fn name(&self) -> NodeName {
        NodeName::from_type_name::<Self>()
    }

    /// Returns failure handling and timeout. Defaults to [`NodeConfig::default`].
    fn config(&self) -> NodeConfig {
        NodeConfig::default()
    }

    /// Returns `true` to skip `process` for this run.
    async fn is_skip(&self, _ctx: &Context<T>) -> bool {
        false
    }

    /// Called before `is_skip`, for pre-execution diagnostics.
    fn before_log(&self) {}

    /// Called after a normal return, for post-execution diagnostics.
    fn after_log(&self) {}

    /// Called when `process` raised a business failure.
    async fn on_business_fail(&self, _ctx: &Context<T>, _error: &BusinessError) {}

    /// Called when the node exceeded its time budget.
    async fn on_timeout_fail(&self, _ctx: &Context<T>) {}

    /// Called when the node failed in any other way.
    async fn on_unknown_fail(&self, _ctx: &Context<T>, _failure: &NodeFailure) {}
}
