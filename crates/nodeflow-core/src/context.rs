//! Per-run context shared by every node of a run.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The business payload of one run plus the identifier used to tag its logs.
///
/// Cloning a `Context` clones the handle, not the payload: every clone refers
/// to the same run. Nodes that are eligible at the same time in a topology
/// share one payload; the lock prevents data races, but keeping concurrent
/// nodes on disjoint fields is up to the node authors.
///
/// # Examples
///
/// ```
/// use nodeflow_core::Context;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = Context::with_run_id("order-42", vec![1, 2]);
/// ctx.write().await.push(3);
///
/// assert_eq!(ctx.run_id(), "order-42");
/// assert_eq!(*ctx.read().await, vec![1, 2, 3]);
/// # }
/// ```
pub struct Context<T> {
    run_id: Arc<str>,
    info: Arc<RwLock<T>>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            run_id: Arc::clone(&self.run_id),
            info: Arc::clone(&self.info),
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl<T> Context<T> {
    /// Creates a context with a random run id.
    pub fn new(info: T) -> Self {
        Self::with_run_id(uuid::Uuid::new_v4().to_string(), info)
    }

    /// Creates a context with a caller-supplied run id.
    pub fn with_run_id(run_id: impl Into<String>, info: T) -> Self {
        Self {
            run_id: Arc::from(run_id.into()),
            info: Arc::new(RwLock::new(info)),
        }
    }

    /// Returns the run id.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Returns the string every log line of this run is tagged with.
    pub fn log_str(&self) -> &str {
        &self.run_id
    }

    /// Locks the payload for reading.
    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.info.read().await
    }

    /// Locks the payload for writing.
    ///
    /// Do not hold the guard across long awaits: concurrently eligible nodes
    /// wait on the same lock.
    pub async fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.info.write().await
    }

    /// Returns the payload, consuming the context.
    ///
    /// Fails and hands the context back if another handle is still alive,
    /// e.g. a timed-out attempt that ignored its cancellation token.
    pub fn into_info(self) -> Result<T, Self> {
        let Self { run_id, info } = self;
        Arc::try_unwrap(info)
            .map(RwLock::into_inner)
            .map_err(|info| Self { run_id, info })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a, T> {
    run_id: &'a str,
    context_info: &'a T,
}

impl<T: Serialize> Context<T> {
    /// Serializes the run id and payload as JSON.
    ///
    /// Serialization failures are rendered into the returned string; this is
    /// diagnostic output and must never fail a node.
    pub async fn snapshot(&self) -> String {
        let info = self.info.read().await;
        let snapshot = Snapshot {
            run_id: &self.run_id,
            context_info: &*info,
        };
        serde_json::to_string(&snapshot)
            .unwrap_or_else(|e| format!("<unserializable context: {}>", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Serialize)]
    struct Order {
        req: String,
        a: Option<String>,
    }

    #[tokio::test]
    async fn test_clones_share_payload() {
        let ctx = Context::with_run_id("run-1", Order::default());
        let other = ctx.clone();
        other.write().await.a = Some("A".to_string());

        assert_eq!(ctx.read().await.a.as_deref(), Some("A"));
        assert_eq!(other.run_id(), "run-1");
    }

    #[test]
    fn test_random_run_ids_differ() {
        let a = Context::new(());
        let b = Context::new(());
        assert_ne!(a.run_id(), b.run_id());
    }

    #[tokio::test]
    async fn test_snapshot() {
        let ctx = Context::with_run_id(
            "run-1",
            Order {
                req: "req".to_string(),
                a: None,
            },
        );
        assert_eq!(
            ctx.snapshot().await,
            r#"{"runId":"run-1","contextInfo":{"req":"req","a":null}}"#
        );
    }

    #[test]
    fn test_into_info_requires_last_handle() {
        let ctx = Context::with_run_id("run-1", 7u32);
        let extra = ctx.clone();

        let ctx = match ctx.into_info() {
            Err(ctx) => ctx,
            Ok(_) => panic!("payload must stay shared while a clone is alive"),
        };
        drop(extra);
        assert_eq!(ctx.into_info().ok(), Some(7));
    }
}
