use std::collections::HashMap;
use std::sync::Arc;

use crate::tool::{Tool, ToolDefinition};

/// Lookup of the tools an agent offers.
///
/// A registry is built once when the agent starts and is read-only afterwards,
/// so implementations need no interior locking.
pub trait ToolRegistry: Send + Sync {
    /// Find a tool by the name it is dispatched under.
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>>;

    /// Names of every registered tool, sorted.
    fn tool_names(&self) -> Vec<String>;

    /// Schemas of every registered tool, sorted by name.
    fn definitions(&self) -> Vec<ToolDefinition>;
}

/// In-memory tool registry for local tool storage and dispatch.
///
/// # Example
///
/// ```rust
/// use nexus_tools::{InMemoryToolRegistry, ToolRegistry};
/// use nexus_tools::standard::PlanTask;
/// use std::sync::Arc;
///
/// let registry = InMemoryToolRegistry::new().with_tool(Arc::new(PlanTask));
///
/// assert!(registry.get("plan_task").is_some());
/// assert!(registry.get("perform_research").is_none());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under its own name. A later tool with the same name replaces
    /// the earlier one.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
