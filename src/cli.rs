use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use crate::model::{DisplayStatus, Priority, SortField, SortOrder};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskmark",
    version,
    about = "Inline title directives and derived task statuses.",
    after_help = "Examples:\n  taskmark parse 'Call Anna !2 !before 24.04.2026'\n  taskmark status --deadline 2026-04-24T00:00:00Z --completed --completed-at 2026-04-25T09:00:00Z\n  taskmark list --status overdue --sort deadline --order asc\n  taskmark mcp --log debug"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Extract !1..!4 and !before DD.MM.YYYY directives from a title
    Parse(ParseArgs),
    /// Derive the display status from deadline and completion fields
    Status(StatusArgs),
    /// List tasks from the data directory seed with filters applied
    List(ListArgs),
    /// Run the Model Context Protocol server over stdio
    Mcp(McpArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Title words, joined with single spaces
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Reference instant for past-deadline checks (RFC 3339, defaults to now)
    #[arg(long, value_name = "TIMESTAMP")]
    pub now: Option<String>,

    /// Print the full parse result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Task deadline (RFC 3339)
    #[arg(long, value_name = "TIMESTAMP")]
    pub deadline: Option<String>,

    /// Whether the task is completed
    #[arg(long)]
    pub completed: bool,

    /// When the task was completed (RFC 3339)
    #[arg(long = "completed-at", value_name = "TIMESTAMP")]
    pub completed_at: Option<String>,

    /// Reference instant (RFC 3339, defaults to now)
    #[arg(long, value_name = "TIMESTAMP")]
    pub now: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only tasks with this display status
    #[arg(long, value_name = "STATUS")]
    pub status: Option<DisplayStatus>,

    /// Only tasks with this priority
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Sort field (created_at, deadline, priority)
    #[arg(long = "sort", value_name = "FIELD")]
    pub sort_field: Option<SortField>,

    /// Sort order (asc, desc)
    #[arg(long = "order", value_name = "ORDER")]
    pub sort_order: Option<SortOrder>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1, value_parser = value_parser!(u32).range(1..))]
    pub pages: u32,
}

#[derive(Args, Debug, Clone)]
pub struct McpArgs {
    /// Override the tracing filter for the MCP server (e.g. "info", "debug")
    #[arg(long = "log", value_name = "DIRECTIVE")]
    pub log_filter: Option<String>,
}
