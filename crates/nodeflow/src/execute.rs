//! Node execution wrapper: skip check, process, hooks and logging.

use crate::report::NodeRecord;
use crate::timeout::{Supervised, TimeoutSupervisor};
use nodeflow_core::{
    Context, ExecutionOutcome, LogLevel, Node, NodeConfig, NodeFailure, NodeLog, NodeName,
    NODE_LOG,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const LOG_END: &str = " execute success";
const NODE_CHAIN_NAME: &str = " nodeChainName=";
const NODE_NAME: &str = " nodeName=";
const LOG_SKIP: &str = " skip=";
const BEFORE_EXECUTE_PARAMS: &str = " beforeExecuteParams=";
const AFTER_EXECUTE_PARAMS: &str = " afterExecuteParams=";
const LOG_TIME: &str = " time=";
const CONTEXT_LOCKED: &str = "<context locked>";

/// A node registered in a dispatcher, with its resolved configuration.
pub(crate) struct NodeEntry<T: Send + Sync> {
    pub(crate) name: NodeName,
    pub(crate) node: Arc<dyn Node<T>>,
    pub(crate) config: NodeConfig,
}

/// Result of one pass through the wrapper.
pub(crate) struct Execution {
    pub(crate) record: NodeRecord,
    pub(crate) failure: Option<NodeFailure>,
}

/// Executes one node against the context.
///
/// Never fails: every failure is classified, logged and handed to the
/// node's hook before being returned for the policy decision.
pub(crate) async fn execute<T>(
    entry: &NodeEntry<T>,
    ctx: &Context<T>,
    log_level: LogLevel,
    chain_name: &str,
) -> Execution
where
    T: Serialize + Send + Sync + 'static,
{
    let node_name = entry.name.as_str();
    let mut log = NodeLog::new(log_level, ctx.log_str());
    log.append(
        LogLevel::Base,
        &[LOG_END, NODE_CHAIN_NAME, chain_name, NODE_NAME, node_name],
    );

    let budget = entry.config.timeout;
    let before = if log.enabled(LogLevel::BaseAndTimeAndParams) {
        Some(bounded_snapshot(ctx, budget).await)
    } else {
        None
    };

    let started = Instant::now();
    entry.node.before_log();

    let node = Arc::clone(&entry.node);
    let attempt_ctx = ctx.clone();
    let supervised = TimeoutSupervisor::new(budget)
        .run(move |cancel| async move {
            if node.is_skip(&attempt_ctx).await {
                return Ok(true);
            }
            node.process(&attempt_ctx, &cancel).await.map(|()| false)
        })
        .await;

    let result = match supervised {
        Supervised::Completed(Ok(skipped)) => Ok(skipped),
        Supervised::Completed(Err(error)) => Err(NodeFailure::from(error)),
        Supervised::Panicked(message) => Err(NodeFailure::Unknown {
            details: format!("node panicked: {}", message),
        }),
        Supervised::TimedOut => Err(NodeFailure::Timeout {
            timeout: budget,
        }),
    };

    match result {
        Ok(skipped) => {
            log.append(LogLevel::Base, &[LOG_SKIP, if skipped { "true" } else { "false" }]);
            entry.node.after_log();
            let elapsed = started.elapsed();

            if let Some(before) = before {
                let after = bounded_snapshot(ctx, budget).await;
                log.append(LogLevel::BaseAndTimeAndParams, &[BEFORE_EXECUTE_PARAMS, &before]);
                log.append(LogLevel::BaseAndTimeAndParams, &[AFTER_EXECUTE_PARAMS, &after]);
            }
            log.append_with(LogLevel::BaseAndTime, LOG_TIME, || {
                elapsed.as_millis().to_string()
            });

            let outcome = if skipped {
                ExecutionOutcome::Skipped
            } else {
                ExecutionOutcome::Success
            };
            Execution {
                record: NodeRecord {
                    node_name: entry.name.clone(),
                    outcome,
                    elapsed,
                    log_line: log.flush(),
                },
                failure: None,
            }
        }
        Err(failure) => {
            let elapsed = started.elapsed();
            log_failure(ctx.log_str(), node_name, &failure);
            let hook = async {
                match &failure {
                    NodeFailure::Business(error) => entry.node.on_business_fail(ctx, error).await,
                    NodeFailure::Timeout { .. } => entry.node.on_timeout_fail(ctx).await,
                    _ => entry.node.on_unknown_fail(ctx, &failure).await,
                }
            };
            if timeout(budget, hook).await.is_err() {
                tracing::warn!(
                    "Failure hook of node '{}' abandoned after {}ms in run '{}'",
                    node_name,
                    budget.as_millis(),
                    ctx.run_id()
                );
            }
            Execution {
                record: NodeRecord {
                    node_name: entry.name.clone(),
                    outcome: failure.outcome(),
                    elapsed,
                    log_line: None,
                },
                failure: Some(failure),
            }
        }
    }
}

/// Reads a snapshot, giving up once `budget` elapses.
///
/// A timed-out attempt may still hold the write lock.
async fn bounded_snapshot<T: Serialize>(ctx: &Context<T>, budget: Duration) -> String {
    timeout(budget, ctx.snapshot())
        .await
        .unwrap_or_else(|_| CONTEXT_LOCKED.to_string())
}

/// Failures are logged with full detail at every level.
fn log_failure(log_str: &str, node_name: &str, failure: &NodeFailure) {
    match failure {
        NodeFailure::Business(error) => tracing::error!(
            target: "nodeflow::node",
            "{}{} execute business fail nodeName={} code={} msg={}",
            NODE_LOG,
            log_str,
            node_name,
            error.code,
            error.msg
        ),
        NodeFailure::Timeout { timeout } => tracing::error!(
            target: "nodeflow::node",
            "{}{} execute timeout fail nodeName={} timeout={}",
            NODE_LOG,
            log_str,
            node_name,
            timeout.as_millis()
        ),
        _ => tracing::error!(
            target: "nodeflow::node",
            "{}{} execute fail nodeName={} msg={}",
            NODE_LOG,
            log_str,
            node_name,
            failure
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nodeflow_core::{business_fail, BusinessError, NodeError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Default, Serialize)]
    struct Payload {
        req: String,
        a: Option<String>,
    }

    #[derive(Default)]
    struct Calls {
        process: AtomicUsize,
        business: AtomicUsize,
        timeout: AtomicUsize,
        unknown: AtomicUsize,
    }

    enum Behavior {
        SetA,
        Skip,
        Business,
        Sleep(Duration),
        Fail,
        Panic,
    }

    struct Probe {
        behavior: Behavior,
        calls: Arc<Calls>,
    }

    #[async_trait]
    impl Node<Payload> for Probe {
        async fn is_skip(&self, _ctx: &Context<Payload>) -> bool {
            matches!(self.behavior, Behavior::Skip)
        }

        async fn process(
            &self,
            ctx: &Context<Payload>,
            _cancel: &CancellationToken,
        ) -> Result<(), NodeError> {
            self.calls.process.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::SetA | Behavior::Skip => {
                    let mut info = ctx.write().await;
                    if info.req == "req" {
                        info.a = Some("A".to_string());
                    }
                    Ok(())
                }
                Behavior::Business => business_fail(1001, "a is required"),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(())
                }
                Behavior::Fail => Err(NodeError::unknown("division by zero")),
                Behavior::Panic => panic!("unexpected state"),
            }
        }

        async fn on_business_fail(&self, _ctx: &Context<Payload>, _error: &BusinessError) {
            self.calls.business.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_timeout_fail(&self, _ctx: &Context<Payload>) {
            self.calls.timeout.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_unknown_fail(&self, _ctx: &Context<Payload>, _failure: &NodeFailure) {
            self.calls.unknown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn entry(behavior: Behavior, timeout: Duration) -> (NodeEntry<Payload>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let entry = NodeEntry {
            name: NodeName::new("Probe"),
            node: Arc::new(Probe {
                behavior,
                calls: Arc::clone(&calls),
            }),
            config: NodeConfig::default().with_timeout(timeout),
        };
        (entry, calls)
    }

    fn context() -> Context<Payload> {
        Context::with_run_id(
            "run-1",
            Payload {
                req: "req".to_string(),
                a: None,
            },
        )
    }

    /// Drops the trailing " time=<ms>" fragment, which varies between runs.
    fn without_time(line: &str) -> &str {
        line.rsplit_once(LOG_TIME).map_or(line, |(head, _)| head)
    }

    #[tokio::test]
    async fn test_success_sets_payload() {
        let (entry, calls) = entry(Behavior::SetA, Duration::from_secs(1));
        let ctx = context();

        let execution = execute(&entry, &ctx, LogLevel::BaseAndTime, "demo").await;

        assert!(execution.failure.is_none());
        assert_eq!(execution.record.outcome, ExecutionOutcome::Success);
        assert_eq!(ctx.read().await.a.as_deref(), Some("A"));
        assert_eq!(calls.process.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_log_fragments_per_level() {
        let ctx = context();
        let (entry, _) = entry(Behavior::SetA, Duration::from_secs(1));

        let none = execute(&entry, &ctx, LogLevel::No, "demo").await;
        assert_eq!(none.record.log_line, None);

        let base = execute(&entry, &ctx, LogLevel::Base, "demo").await;
        assert_eq!(
            base.record.log_line.as_deref(),
            Some("nodeLog run-1 execute success nodeChainName=demo nodeName=Probe skip=false")
        );

        let timed = execute(&entry, &ctx, LogLevel::BaseAndTime, "demo").await;
        let line = timed.record.log_line.unwrap_or_default();
        assert_eq!(
            without_time(&line),
            "nodeLog run-1 execute success nodeChainName=demo nodeName=Probe skip=false"
        );
        assert!(line.contains(" time="));

        let full = execute(&entry, &ctx, LogLevel::BaseAndTimeAndParams, "demo").await;
        let line = full.record.log_line.unwrap_or_default();
        let snapshot = r#"{"runId":"run-1","contextInfo":{"req":"req","a":"A"}}"#;
        assert_eq!(
            without_time(&line),
            format!(
                "nodeLog run-1 execute success nodeChainName=demo nodeName=Probe skip=false \
                 beforeExecuteParams={snapshot} afterExecuteParams={snapshot}"
            )
        );
    }

    #[tokio::test]
    async fn test_log_line_is_repeatable() {
        let ctx = context();
        let (entry, _) = entry(Behavior::SetA, Duration::from_secs(1));
        execute(&entry, &ctx, LogLevel::Base, "demo").await;

        let first = execute(&entry, &ctx, LogLevel::BaseAndTimeAndParams, "demo").await;
        let second = execute(&entry, &ctx, LogLevel::BaseAndTimeAndParams, "demo").await;
        let first = first.record.log_line.unwrap_or_default();
        let second = second.record.log_line.unwrap_or_default();
        assert_eq!(without_time(&first), without_time(&second));
    }

    #[tokio::test]
    async fn test_skip() {
        let (entry, calls) = entry(Behavior::Skip, Duration::from_secs(1));
        let ctx = context();

        let execution = execute(&entry, &ctx, LogLevel::Base, "demo").await;

        assert_eq!(execution.record.outcome, ExecutionOutcome::Skipped);
        assert_eq!(calls.process.load(Ordering::SeqCst), 0);
        assert!(execution
            .record
            .log_line
            .unwrap_or_default()
            .ends_with(" skip=true"));
        assert_eq!(ctx.read().await.a, None);
    }

    #[tokio::test]
    async fn test_business_failure() {
        let (entry, calls) = entry(Behavior::Business, Duration::from_secs(1));
        let execution = execute(&entry, &context(), LogLevel::Base, "demo").await;

        assert_eq!(execution.record.outcome, ExecutionOutcome::BusinessFailed);
        assert_eq!(execution.record.log_line, None);
        assert_eq!(
            execution.failure,
            Some(NodeFailure::Business(BusinessError::new(1001, "a is required")))
        );
        assert_eq!(calls.business.load(Ordering::SeqCst), 1);
        assert_eq!(calls.unknown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout() {
        let (entry, calls) = entry(
            Behavior::Sleep(Duration::from_millis(200)),
            Duration::from_millis(100),
        );
        let execution = execute(&entry, &context(), LogLevel::Base, "demo").await;

        assert_eq!(execution.record.outcome, ExecutionOutcome::TimeoutFailed);
        assert!(execution.record.elapsed < Duration::from_millis(200));
        assert_eq!(calls.timeout.load(Ordering::SeqCst), 1);
        assert_eq!(calls.business.load(Ordering::SeqCst), 0);
        assert_eq!(calls.unknown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_failure_and_panic() {
        for behavior in [Behavior::Fail, Behavior::Panic] {
            let (entry, calls) = entry(behavior, Duration::from_secs(1));
            let execution = execute(&entry, &context(), LogLevel::Base, "demo").await;

            assert_eq!(execution.record.outcome, ExecutionOutcome::UnknownFailed);
            assert_eq!(calls.unknown.load(Ordering::SeqCst), 1);
            assert_eq!(calls.business.load(Ordering::SeqCst), 0);
        }
    }
}
