use thiserror::Error;

use crate::auth::StoreError;

use super::transport::{ApiResponse, TransportError};

/// Fallback text when a rejected login/register carries no message
pub const DEFAULT_AUTH_FAILURE_MESSAGE: &str = "Authentication failed";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    AuthFailure { message: String },

    /// A 401 the gateway could not recover from. Carries the response the
    /// original request was rejected with.
    #[error("Session expired - please log in again")]
    SessionExpired(ApiResponse),

    #[error("Refresh token missing or rejected")]
    InvalidRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success response to an error.
    pub fn from_response(response: ApiResponse) -> Self {
        let truncated = Self::truncate_body(&response.body);
        match response.status {
            401 => ApiError::SessionExpired(response),
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(response.message().unwrap_or(truncated)),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            status => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Rejected login or register; the server's `message` wins when present.
    pub fn auth_failure(response: &ApiResponse) -> Self {
        ApiError::AuthFailure {
            message: response
                .message()
                .unwrap_or_else(|| DEFAULT_AUTH_FAILURE_MESSAGE.to_string()),
        }
    }

    /// True when the caller should send the user back to log in.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired(_) | ApiError::InvalidRefreshToken | ApiError::RefreshFailed(_)
        )
    }

    /// Short text suitable for showing next to a form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AuthFailure { message } => message.clone(),
            e if e.requires_login() => "Session expired. Please log in again.".to_string(),
            ApiError::Network(TransportError::Http(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
