//! Command execution against the core client.

use std::io::{self, Write};

use anyhow::{Context, Result};
use taskdeck_core::{ApiClient, Config, Credentials, Task, TaskInput};
use tracing::{info, warn};

use crate::cli::Command;

/// Maximum title width in the task table
const TITLE_WIDTH: usize = 30;

/// Maximum description width in the task table
const DESCRIPTION_WIDTH: usize = 40;

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => {
            let credentials = prompt_credentials(username, config)?;
            let session = client.login(&credentials).await?;
            remember_username(config, &credentials.username);
            println!("Logged in as {}", session.display_name());
        }
        Command::Register { username } => {
            let credentials = prompt_credentials(username, config)?;
            let session = client.register(&credentials).await?;
            remember_username(config, &credentials.username);
            println!("Registered and logged in as {}", session.display_name());
        }
        Command::Logout => {
            client.logout()?;
            println!("Logged out");
        }
        Command::Status => {
            let session = client.session();
            if session.is_authenticated {
                println!("Logged in as {}", session.display_name());
            } else {
                println!("Not logged in");
            }
        }
        Command::List => print_tasks(&client.list_tasks().await?),
        Command::Add { title, description } => {
            let task = client
                .create_task(&TaskInput::new(title, description))
                .await?;
            println!("Created task #{}", task.id);
            print_tasks(&client.list_tasks().await?);
        }
        Command::Update {
            id,
            title,
            description,
        } => {
            let input = match (title, description) {
                (Some(title), Some(description)) => TaskInput::new(title, description),
                (None, None) => anyhow::bail!("Nothing to update: pass --title and/or --description"),
                (title, description) => {
                    let existing = client.find_task(id).await?;
                    TaskInput::merged(&existing, title, description)
                }
            };
            client.update_task(id, &input).await?;
            println!("Updated task #{}", id);
            print_tasks(&client.list_tasks().await?);
        }
        Command::Delete { id } => {
            let confirmation = client.delete_task(id).await?;
            println!("{}", confirmation);
            print_tasks(&client.list_tasks().await?);
        }
    }
    Ok(())
}

fn remember_username(config: &mut Config, username: &str) {
    config.last_username = Some(username.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

/// Username from the flag, env, or a prompt; password from env or a hidden prompt.
fn prompt_credentials(username: Option<String>, config: &Config) -> Result<Credentials> {
    let username = match username.or_else(|| std::env::var("TASKDECK_USERNAME").ok()) {
        Some(username) => username,
        None => prompt_username(config.last_username.as_deref())?,
    };
    if username.trim().is_empty() {
        anyhow::bail!("Username and password required");
    }

    let password = match std::env::var("TASKDECK_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    if password.is_empty() {
        anyhow::bail!("Username and password required");
    }

    info!(user = %username, "Credentials collected");
    Ok(Credentials::new(username.trim(), password))
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn print_tasks(tasks: &[Task]) {
    print!("{}", format_tasks(tasks));
}

pub fn format_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet.\n".to_string();
    }

    let mut out = format!(
        "{:>5}  {:<title$}  {:<desc$}  {}\n",
        "ID",
        "TITLE",
        "DESCRIPTION",
        "CREATED",
        title = TITLE_WIDTH,
        desc = DESCRIPTION_WIDTH
    );
    for task in tasks {
        out.push_str(&format!(
            "{:>5}  {:<title$}  {:<desc$}  {}\n",
            task.id,
            truncate(&task.title, TITLE_WIDTH),
            truncate(&task.description, DESCRIPTION_WIDTH),
            task.created_display(),
            title = TITLE_WIDTH,
            desc = DESCRIPTION_WIDTH
        ));
    }
    out
}

/// Truncate a string to a maximum length, adding ellipsis if needed
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
