//! Identifiers used to address agents and channels on the bus

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sender id the coordinator stamps on every envelope it publishes
pub const ORCHESTRATOR_SENDER_ID: &str = "orchestrator";

/// Error type for ID validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The ID string is empty
    Empty,
    /// The ID contains only whitespace
    WhitespaceOnly,
    /// The ID has leading or trailing whitespace
    LeadingTrailingWhitespace,
    /// The ID contains invalid characters
    InvalidCharacters,
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "ID cannot be empty"),
            Self::WhitespaceOnly => write!(f, "ID cannot be whitespace-only"),
            Self::LeadingTrailingWhitespace => {
                write!(f, "ID cannot have leading or trailing whitespace")
            }
            Self::InvalidCharacters => write!(
                f,
                "ID can only contain alphanumeric characters, hyphens, underscores, and dots"
            ),
        }
    }
}

impl std::error::Error for IdValidationError {}

fn validate(s: &str, extra: &[char]) -> Result<(), IdValidationError> {
    if s.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if s.trim().is_empty() {
        return Err(IdValidationError::WhitespaceOnly);
    }
    if s != s.trim() {
        return Err(IdValidationError::LeadingTrailingWhitespace);
    }
    if !s
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || extra.contains(&c))
    {
        return Err(IdValidationError::InvalidCharacters);
    }
    Ok(())
}

/// Unique identifier for an agent
///
/// Valid IDs are non-empty, carry no leading/trailing whitespace and contain
/// only alphanumerics, hyphens, underscores and dots. Deserialization
/// validates too, so an id read off the wire is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Parse and validate an agent ID
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_mesh::AgentId;
    ///
    /// assert!(AgentId::parse("gpt-agent_research-001").is_ok());
    /// assert!(AgentId::parse("").is_err());
    /// assert!(AgentId::parse("agent/../etc").is_err());
    /// ```
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        let s = id.as_ref();
        validate(s, &[])?;
        Ok(Self(s.to_string()))
    }

    /// Get the agent ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AgentId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AgentId {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate(&s, &[])?;
        Ok(Self(s))
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a pub/sub channel
///
/// Same rules as [`AgentId`], with `:` additionally allowed so channels can be
/// namespaced (`agent_commands:<agent_id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    /// Shared channel every agent replies on
    pub const ORCHESTRATOR_INBOX: &'static str = "orchestrator_inbox";
    /// Channel the coordinator announces heartbeats on
    pub const AGENT_HEARTBEATS: &'static str = "agent_heartbeats";
    /// Prefix of each agent's dedicated command channel
    pub const AGENT_COMMANDS_PREFIX: &'static str = "agent_commands:";

    /// Parse and validate a channel name
    ///
    /// ```
    /// use nexus_mesh::Channel;
    ///
    /// assert!(Channel::parse("orchestrator_inbox").is_ok());
    /// assert!(Channel::parse("agent_commands:a1").is_ok());
    /// assert!(Channel::parse("two words").is_err());
    /// ```
    pub fn parse(name: impl AsRef<str>) -> Result<Self, IdValidationError> {
        let s = name.as_ref();
        validate(s, &[':'])?;
        Ok(Self(s.to_string()))
    }

    /// The shared coordinator inbox
    pub fn orchestrator_inbox() -> Self {
        Self(Self::ORCHESTRATOR_INBOX.to_string())
    }

    /// The heartbeat announcement channel
    pub fn agent_heartbeats() -> Self {
        Self(Self::AGENT_HEARTBEATS.to_string())
    }

    /// The dedicated command channel of `agent_id`
    ///
    /// Always valid: agent ids are a subset of the channel alphabet.
    pub fn agent_commands(agent_id: &AgentId) -> Self {
        Self(format!("{}{}", Self::AGENT_COMMANDS_PREFIX, agent_id))
    }

    /// Get the channel name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Channel {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Channel {
    type Error = IdValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate(&s, &[':'])?;
        Ok(Self(s))
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
