pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AskArgs, CliArgs, Commands, ConfigArgs, LlmArgs, PlanArgs, ToolsArgs};
pub use handlers::{EXIT_ERROR, EXIT_OK, EXIT_PLANNING_FAILED};
pub use output::{OutputFormat, OutputFormatter};
