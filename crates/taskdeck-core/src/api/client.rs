//! API client for the task service.
//!
//! `ApiClient` bundles credential entry and the task endpoints. Task calls
//! all go through the `Gateway`, so token expiry is handled below this layer.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::{Session, SessionStore};
use crate::models::{Credentials, Task, TaskInput, TaskListResponse};
use crate::models::task::TaskReply;

use super::gateway::Gateway;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

const TASKS_PATH: &str = "tasks/";
const TASKS_ADD_PATH: &str = "tasks/add";

fn task_path(id: i64) -> String {
    format!("tasks/{}", id)
}

#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<Gateway>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        Self {
            gateway: Arc::new(Gateway::new(transport, store)),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// The persisted session as it stands right now.
    pub fn session(&self) -> Session {
        self.gateway.store().load()
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.store().is_authenticated()
    }

    // ===== Credentials =====

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        self.gateway.auth().login(credentials).await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        self.gateway.auth().register(credentials).await
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.gateway.auth().logout()
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response = self.send(ApiRequest::get(TASKS_PATH)).await?;
        let parsed: TaskListResponse = Self::parse(&response, TASKS_PATH)?;
        debug!(count = parsed.tasks.len(), "Tasks fetched");
        Ok(parsed.tasks)
    }

    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, ApiError> {
        let request = ApiRequest::post(TASKS_ADD_PATH).json(input)?;
        let response = self.send(request).await?;
        let reply: TaskReply = Self::parse(&response, TASKS_ADD_PATH)?;
        let task = reply.into_task(None, input).ok_or_else(|| {
            ApiError::InvalidResponse("Create response carried no task id".to_string())
        })?;
        info!(task_id = task.id, "Task created");
        Ok(task)
    }

    pub async fn update_task(&self, id: i64, input: &TaskInput) -> Result<Task, ApiError> {
        let path = task_path(id);
        let request = ApiRequest::put(path.as_str()).json(input)?;
        let response = self.send(request).await?;
        let reply: TaskReply = Self::parse(&response, &path)?;
        let task = reply.into_task(Some(id), input).ok_or_else(|| {
            ApiError::InvalidResponse("Update response carried no task id".to_string())
        })?;
        info!(task_id = id, "Task updated");
        Ok(task)
    }

    /// Delete a task, returning the server's confirmation message.
    pub async fn delete_task(&self, id: i64) -> Result<String, ApiError> {
        let response = self.send(ApiRequest::delete(task_path(id))).await?;
        info!(task_id = id, "Task deleted");
        Ok(response
            .message()
            .unwrap_or_else(|| "Task deleted".to_string()))
    }

    /// Look up a single task by id from the current list.
    pub async fn find_task(&self, id: i64) -> Result<Task, ApiError> {
        self.list_tasks()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Task {}", id)))
    }

    /// Send through the gateway, turning non-success statuses into errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.gateway.call(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response))
        }
    }

    fn parse<T: DeserializeOwned>(response: &ApiResponse, path: &str) -> Result<T, ApiError> {
        response.json().map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }
}
