use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

impl Task {
    /// Creation date for display, e.g. "Jan 05, 2025".
    pub fn created_display(&self) -> String {
        match self.created_at.as_deref() {
            Some(raw) => format_timestamp(raw),
            None => "-".to_string(),
        }
    }
}

/// Title and description as submitted for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
}

impl TaskInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Merge into an existing task, keeping fields the caller left unset.
    pub fn merged(existing: &Task, title: Option<String>, description: Option<String>) -> Self {
        Self {
            title: title.unwrap_or_else(|| existing.title.clone()),
            description: description.unwrap_or_else(|| existing.description.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Reply to create and update: either the task itself or an acknowledgement.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskReply {
    Task(Task),
    Ack {
        #[serde(default)]
        task_id: Option<i64>,
    },
}

impl TaskReply {
    /// Resolve to a `Task`, filling an acknowledgement in from what was sent.
    pub(crate) fn into_task(self, known_id: Option<i64>, input: &TaskInput) -> Option<Task> {
        match self {
            TaskReply::Task(task) => Some(task),
            TaskReply::Ack { task_id } => task_id.or(known_id).map(|id| Task {
                id,
                title: input.title.clone(),
                description: input.description.clone(),
                created_at: None,
            }),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Render RFC 2822 (the reference server's default) or RFC 3339 timestamps as a short date
fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(raw) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        dt.format("%b %d, %Y").to_string()
    } else {
        raw.to_string()
    }
}
