use clap::Args;
use nexus_coordinator::{AgentRegistry, Coordinator, CoordinatorConfig, http};
use nexus_mesh::shutdown_signal;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::error::CliResult;

/// Flags override the `NEXUS_*` environment variables
#[derive(Args, Debug)]
pub struct CoordinatorArgs {
    /// Address to serve the HTTP API on
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Bus URL (redis://... or memory://)
    #[arg(long)]
    bus_url: Option<String>,
    /// Minutes without a heartbeat before an agent is offline
    #[arg(long)]
    active_threshold_minutes: Option<u64>,
    /// Also sweep stale agents on this interval (e.g. 30s)
    #[arg(long, value_parser = crate::parse_duration)]
    reaper_interval: Option<Duration>,
    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

impl CoordinatorArgs {
    fn apply(self, mut config: CoordinatorConfig) -> CliResult<CoordinatorConfig> {
        if let Some(addr) = self.bind {
            config = config.with_bind_addr(addr);
        }
        if let Some(url) = self.bus_url {
            config = config.with_bus_url(url);
        }
        if let Some(minutes) = self.active_threshold_minutes {
            config = config.with_active_threshold_minutes(minutes);
        }
        if self.reaper_interval.is_some() {
            config = config.with_reaper_interval(self.reaper_interval);
        }
        if self.no_cors {
            config = config.with_cors(false);
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: CoordinatorArgs) -> CliResult<()> {
    let config = args.apply(CoordinatorConfig::from_env()?)?;

    let bus = nexus_mesh::connect(&config.bus_url).await?;
    bus.ping().await?;
    let coordinator = Arc::new(
        Coordinator::new(Arc::new(AgentRegistry::default()), bus).with_config(&config),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let inbox = coordinator.spawn_inbox_listener(stop_rx.clone()).await?;
    let reaper = config
        .reaper_interval
        .map(|interval| coordinator.spawn_reaper(interval, stop_rx.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        bind_addr = %config.bind_addr,
        bus_url = %config.bus_url,
        active_threshold_minutes = config.active_threshold_minutes,
        reaper_interval = %config
            .reaper_interval
            .map(|i| humantime::format_duration(i).to_string())
            .unwrap_or_else(|| "disabled".to_string()),
        "Coordinator listening"
    );

    axum::serve(listener, http::router(coordinator, config.enable_cors))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stop_tx.send_replace(true);
    let _ = inbox.await;
    if let Some(reaper) = reaper {
        let _ = reaper.await;
    }
    info!("Coordinator stopped");
    Ok(())
}
