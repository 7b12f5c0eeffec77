//! qscaled — the queue-driven worker pool scaler.
//!
//! Wires the pieces together for one (namespace, language) pool:
//! - Queue store (Redis)
//! - Orchestrator (Marathon)
//! - Gauge sink (statsd)
//! - Control loop
//!
//! # Usage
//!
//! ```text
//! qscaled -n kluge -l english -r tcp://redis:6379 -m http://marathon:8080 -p 10
//! qscaled --config /etc/qscale/english.toml
//! ```

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qscale_autoscale::{ControlLoop, LoopComponents, LoopTiming, PolicyLimits};
use qscale_core::{QueueKeys, ScalerConfig};
use qscale_fleet::{FleetController, MarathonClient};
use qscale_metrics::{MetricsEmitter, StatsdSink};
use qscale_queue::{IdleWorkerRegistry, QueueInspector, RedisQueueStore};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.load_config().context("loading configuration")?;
    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    run(config).await
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qscaled=debug,qscale=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: ScalerConfig) -> anyhow::Result<()> {
    let app = config.app_id();
    info!(
        namespace = %config.namespace,
        language = %config.language,
        %app,
        "qscaled starting"
    );

    // ── Backends ───────────────────────────────────────────────

    let redis_url = config.redis_connection_url()?;
    let store = Arc::new(
        RedisQueueStore::connect(&redis_url, config.call_timeout)
            .await
            .context("connecting to queue store")?,
    );

    let marathon = MarathonClient::new(&config.marathon_url, &app, config.call_timeout)
        .context("building Marathon client")?;
    info!(url = %config.marathon_url, %app, "Marathon client ready");

    let metrics = match connect_statsd(&config).await {
        Ok(sink) => MetricsEmitter::new(Arc::new(sink)),
        Err(e) => {
            warn!(addr = %config.statsd_addr, error = %e, "statsd unavailable, metrics disabled");
            MetricsEmitter::disabled()
        }
    };

    // ── Control loop ───────────────────────────────────────────

    let keys = QueueKeys::new(&config.namespace, &config.language, config.idle_key_shape);
    let components = LoopComponents {
        inspector: QueueInspector::new(store.clone(), keys.clone()),
        registry: IdleWorkerRegistry::new(store, keys),
        fleet: FleetController::new(Arc::new(marathon), config.worker_count_source),
        metrics,
    };
    let limits = PolicyLimits {
        max_workers: config.max_workers,
        idle_ticks_threshold: config.idle_ticks_threshold(),
    };

    let mut control_loop = ControlLoop::bootstrap(components, limits, LoopTiming::from_config(&config))
        .await
        .context("initial observation failed")?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    control_loop.run(shutdown_rx).await;

    info!("qscaled stopped");
    Ok(())
}

async fn connect_statsd(config: &ScalerConfig) -> anyhow::Result<StatsdSink> {
    let (host, port) = config.statsd_endpoint()?;
    let sink = StatsdSink::connect(&host, port, &config.metrics_prefix).await?;
    Ok(sink)
}
