//! Request Enrichment Process.
//!
//! This example walks a request through three dependent lookups:
//! 1. `GetA` derives `a` from the request
//! 2. `GetB` needs `a` and derives `b`
//! 3. `GetC` needs `b` and derives `c`
//!
//! It runs the same nodes as a chain, then as a topology next to an optional
//! recommendation lookup that is allowed to time out, and finally with a
//! request that makes `GetB` refuse.
//!
//! Set `NODEFLOW_LOG_LEVEL=4` to see context snapshots in the node log lines.

use async_trait::async_trait;
use nodeflow::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Serialize)]
struct Request {
    req: String,
    a: Option<String>,
    b: Option<String>,
    c: Option<String>,
    recommendations: Vec<String>,
}

impl Request {
    fn new(req: &str) -> Self {
        Self {
            req: req.to_string(),
            ..Self::default()
        }
    }
}

struct GetA;

#[async_trait]
impl Node<Request> for GetA {
    async fn process(
        &self,
        ctx: &Context<Request>,
        _cancel: &CancellationToken,
    ) -> Result<(), NodeError> {
        let mut request = ctx.write().await;
        if request.req == "req" {
            request.a = Some("A".to_string());
        }
        Ok(())
    }
}

struct GetB;

#[async_trait]
impl Node<Request> for GetB {
    async fn process(
        &self,
        ctx: &Context<Request>,
        _cancel: &CancellationToken,
    ) -> Result<(), NodeError> {
        let mut request = ctx.write().await;
        if request.a.as_deref() != Some("A") {
            return business_fail(1001, "a is required");
        }
        request.b = Some("B".to_string());
        Ok(())
    }

    async fn on_business_fail(&self, ctx: &Context<Request>, error: &BusinessError) {
        println!("GetB refused run {}: {}", ctx.run_id(), error.msg);
    }
}

struct GetC;

#[async_trait]
impl Node<Request> for GetC {
    async fn process(
        &self,
        ctx: &Context<Request>,
        _cancel: &CancellationToken,
    ) -> Result<(), NodeError> {
        let mut request = ctx.write().await;
        if request.b.as_deref() != Some("B") {
            return business_fail(1002, "b is required");
        }
        request.c = Some("C".to_string());
        Ok(())
    }
}

// Slow remote call; honours the cancellation token.
struct Recommend {
    latency: Duration,
}

#[async_trait]
impl Node<Request> for Recommend {
    async fn process(
        &self,
        ctx: &Context<Request>,
        cancel: &CancellationToken,
    ) -> Result<(), NodeError> {
        tokio::select! {
            _ = tokio::time::sleep(self.latency) => {
                ctx.write().await.recommendations = vec!["R1".to_string(), "R2".to_string()];
                Ok(())
            }
            _ = cancel.cancelled() => Ok(()),
        }
    }

    fn config(&self) -> NodeConfig {
        NodeConfig::default()
            .with_fail_handle(FailHandle::Continue)
            .with_timeout(NodeTimeout::Short)
    }

    async fn on_timeout_fail(&self, ctx: &Context<Request>) {
        println!("Recommendations skipped for run {}", ctx.run_id());
    }
}

fn print_report(report: &RunReport) {
    println!(
        "Run {} of '{}' finished in {}ms",
        report.run_id,
        report.chain_name,
        report.elapsed.as_millis()
    );
    for record in &report.records {
        println!("  {:<10} {}", record.node_name, record.outcome);
    }
    for name in &report.aborted {
        println!("  {:<10} NOT STARTED", name);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::from_env();

    // Chain: strict order
    let chain = Dispatcher::chain("enrich-chain")
        .with_config(config.clone())
        .add(GetA)
        .add(GetB)
        .add(GetC)
        .build()?;

    let ctx = Context::new(Request::new("req"));
    let report = chain.run(&ctx).await?;
    print_report(&report);
    println!("Result: {:?}\n", ctx.read().await);

    // Topology: the recommendation lookup runs beside the a -> b -> c path
    let topology = Dispatcher::topology("enrich-topology")
        .with_config(config.clone())
        .add(GetA)
        .add_after(GetB, ["GetA"])
        .add_after(GetC, ["GetB"])
        .add(Recommend {
            latency: Duration::from_millis(1500),
        })
        .build()?;

    let ctx = Context::new(Request::new("req"));
    let report = topology.run(&ctx).await?;
    print_report(&report);
    println!("Result: {:?}\n", ctx.read().await);

    // Chain with a parallel step: both lookups depend on GetA only
    let lookups: Vec<Arc<dyn Node<Request>>> = vec![
        Arc::new(GetB),
        Arc::new(Recommend {
            latency: Duration::from_millis(200),
        }),
    ];
    let grouped = Dispatcher::chain("enrich-grouped")
        .with_config(config)
        .add(GetA)
        .add_parallel(lookups)
        .add(GetC)
        .build()?;

    let ctx = Context::new(Request::new("req"));
    let report = grouped.run(&ctx).await?;
    print_report(&report);
    println!("Result: {:?}\n", ctx.read().await);

    // A request GetA does not recognise: GetB refuses and the chain stops
    let ctx = Context::new(Request::new("unknown"));
    match chain.run(&ctx).await {
        Ok(report) => print_report(&report),
        Err(ProcessError::Interrupted {
            node_name,
            failure,
            report,
            ..
        }) => {
            println!("Interrupted at {}: {}", node_name, failure);
            print_report(&report);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
