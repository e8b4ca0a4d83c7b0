//! Order Coordinator Binary
//!
//! Runs the coordinator against the paper venue. Submission envelopes are
//! read from stdin as JSON lines; one outcome per envelope is written to
//! stdout as a JSON line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-coordinator < envelopes.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_COORDINATOR_CONFIG`: config file path (default: config.yaml)
//! - `RUST_LOG`: log filter, overrides `observability.logging.level`
//! - `OTEL_ENABLED`: export spans over OTLP when `true`

use std::sync::Arc;

use anyhow::Context;
use order_coordinator::application::ports::{
    BrokerPort, ExecutionReportStore, ReferencePricePort,
};
use order_coordinator::config::{CONFIG_PATH_ENV, Config, load_config_or_default};
use order_coordinator::infrastructure::PaperVenue;
use order_coordinator::observability::{MetricsConfig, init_metrics};
use order_coordinator::telemetry::init_telemetry;
use order_coordinator::{CoordinatorHandle, OrderCoordinator, OutcomeStream, SubmissionEnvelope};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var(CONFIG_PATH_ENV).ok();
    let config = load_config_or_default(config_path.as_deref())
        .context("failed to load configuration")?;
    let _telemetry = init_telemetry(&config.observability.logging);

    if let Some(port) = config.observability.metrics_port {
        init_metrics(&MetricsConfig::with_port(port)).context("failed to start metrics")?;
    }
    log_config(&config);

    let venue = Arc::new(PaperVenue::new(&config.paper));
    let broker: Arc<dyn BrokerPort> = venue.clone();
    let prices: Arc<dyn ReferencePricePort> = venue.clone();
    let reports: Arc<dyn ExecutionReportStore> = venue;
    let coordinator = OrderCoordinator::new(broker, prices, reports, config.coordinator);
    let (handle, outcomes) = coordinator.start();
    let printer = tokio::spawn(print_outcomes(outcomes));

    tokio::select! {
        result = read_envelopes(&handle) => result?,
        _ = signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping dispatcher");
            handle.shutdown();
        }
    }

    let joined = handle.join().await;
    let printed = printer.await.context("outcome printer failed")?;
    tracing::info!("Order coordinator stopped");
    joined?;
    printed
}

/// Submit every envelope read from stdin until EOF.
async fn read_envelopes(handle: &CoordinatorHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SubmissionEnvelope>(line) {
            Ok(envelope) => handle.submit_order(envelope)?,
            Err(err) => tracing::warn!(error = %err, "Skipping malformed envelope"),
        }
    }
    Ok(())
}

async fn print_outcomes(mut outcomes: OutcomeStream) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(outcome) = outcomes.next().await {
        let mut line = serde_json::to_vec(&outcome)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Load .env from the current directory or the nearest ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

fn log_config(config: &Config) {
    tracing::info!(
        reply_routing = ?config.coordinator.reply_routing,
        fatal_policy = ?config.coordinator.fatal_policy,
        poll_interval_ms = config.coordinator.poll_interval_ms,
        max_concurrent_watchers = ?config.coordinator.max_concurrent_watchers,
        symbols = config.paper.symbols.len(),
        "Configuration loaded"
    );
}
