//! walmon - wal-g backup health exporter
//!
//! Periodically runs wal-g status checks for each configured Postgres
//! cluster, scans the backup bucket for upload freshness, and exposes the
//! results as Prometheus gauges.

mod collector;
mod config;
mod metrics;
mod probe;
mod scheduler;
mod storage;
mod web;

use collector::TargetCollector;
use config::Config;
use metrics::PrometheusSink;
use probe::{CommandProbe, CommandSpec};
use scheduler::Scheduler;
use storage::S3Lister;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("walmon=info".parse()?))
        .init();

    // Optional .env file carrying wal-g credentials and target config
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(e) => tracing::debug!("No .env file loaded: {}", e),
    }

    let cfg = Config::load()?;
    tracing::info!("Poll interval set to {:?}", cfg.poll_interval);
    tracing::info!("Exporter listens on TCP port {}", cfg.http_port);
    tracing::info!(
        "Enabling metrics exposure for the following target(s): {}",
        cfg.targets
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    tracing::info!(
        "S3 bucket: {} (region {}), environment tag: {}",
        cfg.bucket,
        cfg.region,
        cfg.env_tag
    );

    let sink = Arc::new(PrometheusSink::new()?);
    let lister = Arc::new(S3Lister::new(&cfg.region).await);

    let collector = Arc::new(TargetCollector::new(
        Arc::new(CommandProbe::new(CommandSpec::wal_verify())),
        Arc::new(CommandProbe::new(CommandSpec::wal_show())),
        Arc::new(CommandProbe::new(CommandSpec::backup_count())),
        lister,
        sink.clone(),
        cfg.bucket.clone(),
    ));

    let scheduler = Scheduler::new(collector, cfg.poll_interval);
    scheduler.start(cfg.targets.clone()).await;

    let server = Server::new(cfg.http_port, sink);
    server.start().await?;

    scheduler.stop_all().await;

    Ok(())
}
