use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;

mod agent;
mod coordinator;
mod error;
mod tools;

use nexus_agent::AgentProfile;

#[derive(Parser, Debug)]
#[command(name = "nexus", version)]
#[command(about = "Nexus - multi-agent coordinator and agent runtime")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the coordinator (registry, command routing, HTTP API)
    Coordinator(coordinator::CoordinatorArgs),
    /// Run one agent from the stock fleet
    Agent(agent::AgentArgs),
    /// Print the tool definitions a profile serves, as JSON
    Tools {
        /// Agent profile (research, ops_execution, comms, strategy)
        #[arg(long)]
        profile: AgentProfile,
    },
}

/// Accepts `10`, `10s`, `1m30s`, ...
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Coordinator(args) => coordinator::run(args).await,
        Commands::Agent(args) => agent::run(args).await,
        Commands::Tools { profile } => tools::print_definitions(profile),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "nexus exited with an error");
            ExitCode::FAILURE
        }
    }
}
