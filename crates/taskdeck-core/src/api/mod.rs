//! REST API access for the task service.
//!
//! This module provides the `ApiClient` for logging in and managing tasks,
//! the `Gateway` every authenticated call goes through, and the `Transport`
//! seam the gateway dispatches on.
//!
//! The API uses bearer access tokens that expire; the gateway renews them
//! with the stored refresh token and retries the failed call once.

pub mod auth;
pub mod client;
pub mod error;
pub mod gateway;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::AuthClient;
pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::{AttemptedRequest, Gateway};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
