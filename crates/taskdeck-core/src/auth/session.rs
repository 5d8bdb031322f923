use serde::{Deserialize, Serialize};

/// The client-held record of the current authentication state.
///
/// A session is either fully populated (every field set, authenticated) or
/// fully cleared. Partial records are never persisted; the store treats them
/// as corrupt and loads the empty session instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Session {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(
        user_id: i64,
        username: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            username: Some(username.into()),
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            is_authenticated: true,
        }
    }

    /// Same identity and refresh token, new access token.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            is_authenticated: true,
            ..self.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.username.is_none()
            && self.access_token.is_none()
            && self.refresh_token.is_none()
            && !self.is_authenticated
    }

    pub fn is_fully_populated(&self) -> bool {
        self.user_id.is_some()
            && self.username.is_some()
            && self.access_token.is_some()
            && self.refresh_token.is_some()
            && self.is_authenticated
    }

    /// True for the only two shapes a session may take.
    pub fn is_consistent(&self) -> bool {
        self.is_empty() || self.is_fully_populated()
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("(not logged in)")
    }
}
