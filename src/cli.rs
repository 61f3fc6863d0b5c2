use clap::{Args, Parser, Subcommand};

use tdo_core::{PeriodFilter, Priority, StatusFilter, TaskOrder};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tdo",
    version,
    about = "A command-line client for a shared todo service.",
    after_help = "Examples:\n  tdo list --status active\n  tdo list --period week --order priority-desc\n  tdo add Ship the release --priority high --deadline 2024-12-24\n  tdo toggle 42\n  tdo delete 42 --yes"
)]
pub struct Cli {
    /// Override the service base URL (defaults to $TDO_API_URL, then localhost)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the tracing filter (e.g. "info", "tdo_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List tasks for the given filters
    List(ListArgs),
    /// Show a single task by id
    Show(ShowArgs),
    /// Add a new task
    Add(AddArgs),
    /// Toggle completion for one or more tasks
    Toggle(ToggleArgs),
    /// Delete one or more tasks after confirmation
    Delete(DeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Completion filter
    #[arg(long, value_enum, default_value_t)]
    pub status: StatusFilter,

    /// Creation-period filter
    #[arg(long, value_enum, default_value_t)]
    pub period: PeriodFilter,

    /// Sort order
    #[arg(long, value_enum, default_value_t)]
    pub order: TaskOrder,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Task id
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Optional detail message
    #[arg(long)]
    pub message: Option<String>,

    /// Deadline (RFC 3339, or YYYY-MM-DD for end of that day, local time)
    #[arg(long, value_name = "DATE")]
    pub deadline: Option<String>,

    /// Priority
    #[arg(long, value_enum, default_value_t)]
    pub priority: Priority,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    /// Task ids
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Task ids
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}
