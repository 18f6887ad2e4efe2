use clap::Args;
use nexus_agent::{AgentConfig, AgentProfile};
use nexus_mesh::shutdown_signal;
use nexus_tools::ArgumentPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::error::CliResult;

/// Flags override the `NEXUS_*` environment variables
#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Agent profile (research, ops_execution, comms, strategy)
    #[arg(long)]
    profile: AgentProfile,
    /// Coordinator base URL
    #[arg(long)]
    coordinator_url: Option<String>,
    /// Bus URL (redis://... or memory://)
    #[arg(long)]
    bus_url: Option<String>,
    /// Time between heartbeats (e.g. 10s)
    #[arg(long, value_parser = crate::parse_duration)]
    heartbeat_interval: Option<Duration>,
    /// Directory holding internal documents
    #[arg(long)]
    docs_dir: Option<PathBuf>,
    /// How tool arguments are checked against their schema (lenient, enforce)
    #[arg(long)]
    argument_policy: Option<ArgumentPolicy>,
}

impl AgentArgs {
    fn apply(&self, mut config: AgentConfig) -> CliResult<AgentConfig> {
        if let Some(url) = &self.coordinator_url {
            config = config.with_coordinator_url(url.clone());
        }
        if let Some(url) = &self.bus_url {
            config = config.with_bus_url(url.clone());
        }
        if let Some(interval) = self.heartbeat_interval {
            config = config.with_heartbeat_interval(interval);
        }
        if let Some(dir) = &self.docs_dir {
            config = config.with_docs_dir(dir.clone());
        }
        if let Some(policy) = self.argument_policy {
            config = config.with_argument_policy(policy);
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: AgentArgs) -> CliResult<()> {
    let config = args.apply(AgentConfig::from_env()?)?;
    let runtime = args.profile.runtime(&config).await?;

    info!(
        agent_id = %runtime.identity().agent_id,
        profile = %args.profile,
        heartbeat_interval = %humantime::format_duration(config.heartbeat_interval),
        "Starting agent"
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        stop_tx.send_replace(true);
    });

    runtime.run(stop_rx).await?;
    Ok(())
}
