use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Manage your tasks from the terminal")]
pub struct Cli {
    /// API base URL (overrides config and TASKDECK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Status,
    /// List your tasks
    List,
    /// Create a task
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
    },
    /// Change a task's title and/or description
    Update {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a task
    Delete { id: i64 },
}
