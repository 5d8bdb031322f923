//! Taskdeck core library.
//!
//! Session lifecycle and API access for the taskdeck task manager:
//!
//! - `auth`: the `Session` record, the `SessionStore` that owns it, and the
//!   key-value backends it persists through
//! - `api`: the authenticated request `Gateway` (attach token, refresh once on
//!   401, retry) and the `ApiClient` for login and task CRUD
//! - `models`: task and credential types
//! - `config`: on-disk configuration and client construction

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionStore};
pub use config::Config;
pub use models::{Credentials, Task, TaskInput};
