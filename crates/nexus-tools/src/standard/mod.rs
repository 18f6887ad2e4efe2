//! The simulated tools carried by the stock agent fleet

pub mod comms;
pub mod research;
pub mod shell;
pub mod strategy;

pub use comms::SendCommunication;
pub use research::{DEFAULT_DOCS_DIR, INTERNAL_REPORT_FILE, PerformResearch};
pub use shell::{ExecuteShellCommand, WHITELISTED_COMMANDS};
pub use strategy::PlanTask;
