use nexus_agent::{AgentConfig, AgentProfile};

use crate::error::CliResult;

/// Print a profile's tool advertisement
pub fn print_definitions(profile: AgentProfile) -> CliResult<()> {
    let dispatcher = profile.dispatcher(&AgentConfig::default());
    let definitions = dispatcher.definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}
