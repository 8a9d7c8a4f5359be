//! Chain and topology dispatchers.

use crate::config::EngineConfig;
use crate::error::ProcessError;
use crate::execute::{execute, NodeEntry};
use crate::policy::{decide, PolicyDecision};
use crate::report::RunReport;
use futures::stream::{FuturesUnordered, StreamExt};
use nodeflow_core::{
    Context, ExecutionOutcome, LogLevel, Node, NodeConfig, NodeFailure, NodeName,
};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How a dispatcher orders its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Strict declaration order (parallel groups aside).
    Chain,
    /// Declared dependencies; independent nodes may run concurrently.
    Topology,
}

struct Scheduled<T: Send + Sync> {
    entry: NodeEntry<T>,
    deps: Vec<usize>,
}

/// Runs a fixed set of nodes over one [`Context`] per run.
///
/// Built once, with [`Dispatcher::chain`] or [`Dispatcher::topology`], and
/// reused for any number of runs. A node starts as soon as every dependency
/// has reached an outcome, up to `max_parallel` nodes at once, picked in
/// declaration order. Each outcome goes through the node's failure policy as
/// it arrives. A failure under `Interrupt` starts nothing else: nodes already
/// running finish, every other node is reported as aborted, and the failure
/// is returned to the caller.
pub struct Dispatcher<T: Send + Sync> {
    name: String,
    mode: DispatchMode,
    nodes: Vec<Scheduled<T>>,
    config: EngineConfig,
}

impl<T: Send + Sync> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field(
                "nodes",
                &self.nodes.iter().map(|n| &n.entry.name).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Send + Sync> Dispatcher<T> {
    /// Starts a chain: nodes run one after another in the order added.
    pub fn chain(name: impl Into<String>) -> ChainBuilder<T> {
        ChainBuilder::new(name)
    }

    /// Starts a topology: nodes run once their declared dependencies are done.
    pub fn topology(name: impl Into<String>) -> TopologyBuilder<T> {
        TopologyBuilder::new(name)
    }

    /// Returns the chain name used in log lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dispatch mode.
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the node names in declaration order.
    pub fn node_names(&self) -> impl Iterator<Item = &NodeName> {
        self.nodes.iter().map(|n| &n.entry.name)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the names of the nodes `node_name` depends on.
    pub fn dependencies(&self, node_name: &str) -> Option<Vec<&NodeName>> {
        self.nodes
            .iter()
            .find(|n| n.entry.name.as_str() == node_name)
            .map(|n| n.deps.iter().map(|&d| &self.nodes[d].entry.name).collect())
    }
}

impl<T> Dispatcher<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Runs every node against `ctx` at the configured log level.
    pub async fn run(&self, ctx: &Context<T>) -> Result<RunReport, ProcessError> {
        self.run_with_log_level(ctx, self.config.log_level).await
    }

    /// Runs every node against `ctx` with an explicit log level.
    pub async fn run_with_log_level(
        &self,
        ctx: &Context<T>,
        log_level: LogLevel,
    ) -> Result<RunReport, ProcessError> {
        let started_at = Instant::now();
        let count = self.nodes.len();
        let mut started = vec![false; count];
        let mut outcomes: Vec<Option<ExecutionOutcome>> = vec![None; count];
        let mut records = Vec::with_capacity(count);

        debug!(
            "Run '{}' of chain '{}' started with {} nodes",
            ctx.run_id(),
            self.name,
            count
        );

        let limit = self.config.max_parallel.max(1);
        let mut in_flight = FuturesUnordered::new();
        let mut interrupted: Option<(usize, NodeFailure)> = None;

        loop {
            if interrupted.is_none() {
                for i in 0..count {
                    if in_flight.len() >= limit {
                        break;
                    }
                    let ready = self.nodes[i].deps.iter().all(|&d| outcomes[d].is_some());
                    if started[i] || !ready {
                        continue;
                    }
                    started[i] = true;
                    in_flight.push(async move {
                        let entry = &self.nodes[i].entry;
                        (i, execute(entry, ctx, log_level, &self.name).await)
                    });
                }
            }

            let Some((i, execution)) = in_flight.next().await else {
                break;
            };
            let outcome = execution.record.outcome;
            outcomes[i] = Some(outcome);
            records.push(execution.record);

            let Some(failure) = execution.failure else {
                continue;
            };
            let fail_handle = self.nodes[i].entry.config.fail_handle;
            if decide(fail_handle, outcome) == PolicyDecision::Interrupt {
                if interrupted.is_none() {
                    interrupted = Some((i, failure));
                }
            } else {
                info!(
                    "Node '{}' failed with {} and was bypassed in run '{}'",
                    self.nodes[i].entry.name,
                    outcome,
                    ctx.run_id()
                );
            }
        }

        if let Some((i, failure)) = interrupted {
            let aborted: Vec<NodeName> = (0..count)
                .filter(|&j| !started[j])
                .map(|j| self.nodes[j].entry.name.clone())
                .collect();
            let node_name = self.nodes[i].entry.name.clone();
            warn!(
                "Run '{}' of chain '{}' interrupted by node '{}', {} nodes not started",
                ctx.run_id(),
                self.name,
                node_name,
                aborted.len()
            );
            let report = RunReport {
                run_id: ctx.run_id().to_string(),
                chain_name: self.name.clone(),
                records,
                aborted,
                elapsed: started_at.elapsed(),
            };
            return Err(ProcessError::Interrupted {
                chain_name: self.name.clone(),
                node_name,
                failure,
                report: Box::new(report),
            });
        }

        let elapsed = started_at.elapsed();
        debug!(
            "Run '{}' of chain '{}' completed in {}ms",
            ctx.run_id(),
            self.name,
            elapsed.as_millis()
        );
        Ok(RunReport {
            run_id: ctx.run_id().to_string(),
            chain_name: self.name.clone(),
            records,
            aborted: Vec::new(),
            elapsed,
        })
    }
}

struct Pending<T: Send + Sync> {
    name: NodeName,
    node: Arc<dyn Node<T>>,
    config: Option<NodeConfig>,
    deps: Vec<NodeName>,
}

/// Collects nodes and validates the dependency graph.
struct GraphBuilder<T: Send + Sync> {
    name: String,
    pending: Vec<Pending<T>>,
    config: EngineConfig,
}

impl<T: Send + Sync> GraphBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    fn push(
        &mut self,
        node: Arc<dyn Node<T>>,
        config: Option<NodeConfig>,
        deps: Vec<NodeName>,
    ) -> NodeName {
        let name = node.name();
        self.pending.push(Pending {
            name: name.clone(),
            node,
            config,
            deps,
        });
        name
    }

    fn build(self, mode: DispatchMode) -> Result<Dispatcher<T>, ProcessError> {
        if self.pending.is_empty() {
            return Err(ProcessError::Configuration(format!(
                "chain '{}' has no nodes",
                self.name
            )));
        }

        let mut index: HashMap<NodeName, usize> = HashMap::with_capacity(self.pending.len());
        for (i, p) in self.pending.iter().enumerate() {
            if index.insert(p.name.clone(), i).is_some() {
                return Err(ProcessError::DuplicateNode(p.name.clone()));
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let graph_nodes: Vec<_> = (0..self.pending.len()).map(|i| graph.add_node(i)).collect();
        let mut deps_by_node = Vec::with_capacity(self.pending.len());
        for (i, p) in self.pending.iter().enumerate() {
            let mut deps = Vec::with_capacity(p.deps.len());
            for dep in &p.deps {
                let d = *index
                    .get(dep)
                    .ok_or_else(|| ProcessError::NodeNotFound(dep.clone()))?;
                if !deps.contains(&d) {
                    deps.push(d);
                    graph.add_edge(graph_nodes[d], graph_nodes[i], ());
                }
            }
            deps_by_node.push(deps);
        }

        if let Err(cycle) = toposort(&graph, None) {
            let at = graph[cycle.node_id()];
            return Err(ProcessError::CyclicDependency(self.pending[at].name.clone()));
        }

        let nodes = self
            .pending
            .into_iter()
            .zip(deps_by_node)
            .map(|(p, deps)| {
                let config = p.config.unwrap_or_else(|| p.node.config());
                Scheduled {
                    entry: NodeEntry {
                        name: p.name,
                        node: p.node,
                        config,
                    },
                    deps,
                }
            })
            .collect();

        Ok(Dispatcher {
            name: self.name,
            mode,
            nodes,
            config: self.config,
        })
    }
}

/// Builder for a [`Dispatcher`] in chain mode.
///
/// # Examples
///
/// ```
/// use nodeflow::prelude::*;
/// use async_trait::async_trait;
///
/// struct Greet;
///
/// #[async_trait]
/// impl Node<Vec<String>> for Greet {
///     async fn process(
///         &self,
///         ctx: &Context<Vec<String>>,
///         _cancel: &CancellationToken,
///     ) -> Result<(), NodeError> {
///         ctx.write().await.push("hello".to_string());
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), ProcessError> {
/// let chain = Dispatcher::chain("greeting").add(Greet).build()?;
///
/// let ctx = Context::new(Vec::new());
/// let report = chain.run(&ctx).await?;
/// assert_eq!(report.outcome("Greet"), Some(ExecutionOutcome::Success));
/// # Ok(())
/// # }
/// ```
pub struct ChainBuilder<T: Send + Sync> {
    graph: GraphBuilder<T>,
    previous: Vec<NodeName>,
}

impl<T: Send + Sync> ChainBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            graph: GraphBuilder::new(name),
            previous: Vec::new(),
        }
    }

    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.graph.config = config;
        self
    }

    /// Appends a node.
    pub fn add<N: Node<T> + 'static>(self, node: N) -> Self {
        self.add_shared(Arc::new(node), None)
    }

    /// Appends a node, overriding its own [`NodeConfig`].
    pub fn add_configured<N: Node<T> + 'static>(self, node: N, config: NodeConfig) -> Self {
        self.add_shared(Arc::new(node), Some(config))
    }

    /// Appends an already shared node instance.
    pub fn add_shared(mut self, node: Arc<dyn Node<T>>, config: Option<NodeConfig>) -> Self {
        let deps = std::mem::take(&mut self.previous);
        let name = self.graph.push(node, config, deps);
        self.previous.push(name);
        self
    }

    /// Appends a group of nodes that run concurrently as one step.
    ///
    /// Every member waits for the previous step; the next step waits for
    /// every member.
    pub fn add_parallel<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Node<T>>>,
    {
        let deps = std::mem::take(&mut self.previous);
        for node in nodes {
            let name = self.graph.push(node, None, deps.clone());
            self.previous.push(name);
        }
        if self.previous.is_empty() {
            self.previous = deps;
        }
        self
    }

    /// Validates the chain and builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher<T>, ProcessError> {
        self.graph.build(DispatchMode::Chain)
    }
}

/// Builder for a [`Dispatcher`] in topology mode.
///
/// Dependencies are referenced by [`NodeName`] and may name nodes added
/// later; they are resolved and checked for cycles by [`build`](Self::build).
pub struct TopologyBuilder<T: Send + Sync> {
    graph: GraphBuilder<T>,
}

impl<T: Send + Sync> TopologyBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            graph: GraphBuilder::new(name),
        }
    }

    /// Sets the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.graph.config = config;
        self
    }

    /// Adds a node with no dependencies.
    pub fn add<N: Node<T> + 'static>(self, node: N) -> Self {
        self.add_shared(Arc::new(node), None, Vec::<NodeName>::new())
    }

    /// Adds a node that starts after every node in `deps`.
    pub fn add_after<N, I, D>(self, node: N, deps: I) -> Self
    where
        N: Node<T> + 'static,
        I: IntoIterator<Item = D>,
        D: Into<NodeName>,
    {
        self.add_shared(Arc::new(node), None, deps)
    }

    /// Adds a node with an explicit [`NodeConfig`] and dependencies.
    pub fn add_configured<N, I, D>(self, node: N, config: NodeConfig, deps: I) -> Self
    where
        N: Node<T> + 'static,
        I: IntoIterator<Item = D>,
        D: Into<NodeName>,
    {
        self.add_shared(Arc::new(node), Some(config), deps)
    }

    /// Adds an already shared node instance.
    pub fn add_shared<I, D>(
        mut self,
        node: Arc<dyn Node<T>>,
        config: Option<NodeConfig>,
        deps: I,
    ) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<NodeName>,
    {
        let deps = deps.into_iter().map(Into::into).collect();
        self.graph.push(node, config, deps);
        self
    }

    /// Validates the graph and builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher<T>, ProcessError> {
        self.graph.build(DispatchMode::Topology)
    }
}
