//! Data models exchanged with the task API.
//!
//! - `Credentials`: username/password pair sent to login and register
//! - `Task`, `TaskInput`: a task as returned by the server and as submitted

pub mod credentials;
pub mod task;

pub use credentials::Credentials;
pub use task::{Task, TaskInput, TaskListResponse};
