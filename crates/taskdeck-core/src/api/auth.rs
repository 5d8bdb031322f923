//! Credential entry (login, register, logout) and the token refresh protocol.
//!
//! Login and register are sent without a bearer token and never go through
//! the gateway's refresh-and-retry path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Session, SessionStore};
use crate::models::Credentials;

use super::transport::{ApiRequest, Transport};
use super::ApiError;

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
pub(crate) const REFRESH_PATH: &str = "auth/refresh";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default, alias = "userId")]
    user_id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

impl AuthResponse {
    fn has_tokens(&self) -> bool {
        self.access_token.is_some()
    }

    /// Build a full session, or fail if any required field is missing.
    fn into_session(self, submitted_username: &str) -> Result<Session, ApiError> {
        let missing = |field: &str| {
            ApiError::InvalidResponse(format!("Auth response is missing `{}`", field))
        };
        Ok(Session::authenticated(
            self.user_id.ok_or_else(|| missing("user_id"))?,
            self.username
                .unwrap_or_else(|| submitted_username.to_string()),
            self.access_token.ok_or_else(|| missing("access_token"))?,
            self.refresh_token.ok_or_else(|| missing("refresh_token"))?,
        ))
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
}

/// Establishes, renews, and ends sessions.
#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        Self { transport, store }
    }

    /// Log in and persist the resulting session.
    ///
    /// On failure the stored session is left exactly as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let auth = self.authenticate(LOGIN_PATH, credentials).await?;
        let session = auth.into_session(&credentials.username)?;
        self.store.save(&session)?;
        info!(user = %credentials.username, "Login successful");
        Ok(session)
    }

    /// Register a new account and persist the resulting session.
    ///
    /// Servers that answer registration with only an acknowledgement get a
    /// follow-up login with the same credentials.
    pub async fn register(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let auth = self.authenticate(REGISTER_PATH, credentials).await?;
        if !auth.has_tokens() {
            debug!(user = %credentials.username, "Registration returned no tokens, logging in");
            return self.login(credentials).await;
        }
        let session = auth.into_session(&credentials.username)?;
        self.store.save(&session)?;
        info!(user = %credentials.username, "Registration successful");
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Does not touch the session store; persisting the token is the
    /// caller's job. The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, ApiError> {
        let refresh_token = refresh_token.ok_or(ApiError::InvalidRefreshToken)?;

        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh_token })?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, "Refresh token rejected");
            return Err(ApiError::InvalidRefreshToken);
        }

        let parsed: RefreshResponse = response
            .json()
            .map_err(|e| ApiError::RefreshFailed(format!("unreadable response: {}", e)))?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                debug!("Access token refreshed");
                Ok(token)
            }
            _ => Err(ApiError::RefreshFailed(
                "response carried no access token".to_string(),
            )),
        }
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post(path).json(credentials)?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(status = response.status, path, user = %credentials.username, "Authentication rejected");
            return Err(ApiError::auth_failure(&response));
        }

        response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse auth response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{alice, memory_store, ok, status, ScriptedTransport};
    use serde_json::json;

    fn alice_login_response() -> serde_json::Value {
        json!({"user_id": 1, "username": "alice", "access_token": "A1", "refresh_token": "R1"})
    }

    #[tokio::test]
    async fn test_login_persists_full_session() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.path, LOGIN_PATH);
            assert_eq!(req.bearer, None);
            assert_eq!(
                req.body,
                Some(json!({"username": "alice", "password": "secret"}))
            );
            ok(alice_login_response())
        });
        let store = memory_store(None);
        let auth = AuthClient::new(transport, store.clone());

        let session = auth
            .login(&Credentials::new("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(session, alice());
        assert_eq!(store.load(), alice());
        assert!(store.load().is_authenticated);
    }

    #[tokio::test]
    async fn test_login_accepts_camel_case_fields() {
        let transport = ScriptedTransport::new(|_| {
            ok(json!({"userId": 1, "username": "alice", "accessToken": "A1", "refreshToken": "R1"}))
        });
        let store = memory_store(None);
        let auth = AuthClient::new(transport, store.clone());

        auth.login(&Credentials::new("alice", "secret")).await.unwrap();
        assert_eq!(store.load(), alice());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_existing_session() {
        let transport = ScriptedTransport::new(|_| {
            status(401, json!({"message": "Invalid credentials"}))
        });
        let existing = Session::authenticated(2, "bob", "B1", "BR1");
        let store = memory_store(Some(existing.clone()));
        let auth = AuthClient::new(transport, store.clone());

        let err = auth
            .login(&Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();

        match err {
            ApiError::AuthFailure { message } => assert_eq!(message, "Invalid credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.load(), existing);
    }

    #[tokio::test]
    async fn test_incomplete_login_response_writes_nothing() {
        // Token but no refresh token or user id
        let transport = ScriptedTransport::new(|_| ok(json!({"access_token": "A1", "username": "alice"})));
        let store = memory_store(None);
        let auth = AuthClient::new(transport, store.clone());

        let err = auth
            .login(&Credentials::new("alice", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert!(store.load().is_empty());
    }

    #[tokio::test]
    async fn test_register_with_tokens() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.path, REGISTER_PATH);
            ok(alice_login_response())
        });
        let store = memory_store(None);
        let auth = AuthClient::new(transport.clone(), store.clone());

        auth.register(&Credentials::new("alice", "secret")).await.unwrap();
        assert_eq!(store.load(), alice());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_register_acknowledgement_falls_back_to_login() {
        let transport = ScriptedTransport::new(|req| match req.path.as_str() {
            REGISTER_PATH => status(201, json!({"message": "User registered successfully"})),
            LOGIN_PATH => ok(alice_login_response()),
            other => panic!("unexpected path {other}"),
        });
        let store = memory_store(None);
        let auth = AuthClient::new(transport.clone(), store.clone());

        let session = auth.register(&Credentials::new("alice", "secret")).await.unwrap();
        assert_eq!(session, alice());
        assert_eq!(store.load(), alice());
        assert_eq!(transport.requests_to(LOGIN_PATH).len(), 1);
    }

    #[tokio::test]
    async fn test_register_conflict_leaves_session() {
        let transport = ScriptedTransport::new(|_| {
            status(400, json!({"message": "Username already exists"}))
        });
        let store = memory_store(Some(alice()));
        let auth = AuthClient::new(transport, store.clone());

        let err = auth
            .register(&Credentials::new("alice", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Username already exists");
        assert_eq!(store.load(), alice());
    }

    #[tokio::test]
    async fn test_refresh_without_token_skips_network() {
        let transport = ScriptedTransport::new(|_| panic!("no request expected"));
        let auth = AuthClient::new(transport.clone(), memory_store(None));

        let err = auth.refresh(None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRefreshToken));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.path, REFRESH_PATH);
            assert_eq!(req.body, Some(json!({"refresh_token": "R1"})));
            ok(json!({"access_token": "A2"}))
        });
        let store = memory_store(Some(alice()));
        let auth = AuthClient::new(transport, store.clone());

        assert_eq!(auth.refresh(Some("R1")).await.unwrap(), "A2");
        // Refresh alone never writes the store
        assert_eq!(store.load(), alice());
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let transport = ScriptedTransport::new(|_| status(401, json!({"message": "Token has expired"})));
        let auth = AuthClient::new(transport, memory_store(None));

        let err = auth.refresh(Some("R-expired")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_without_access_token_in_body() {
        let transport = ScriptedTransport::new(|_| ok(json!({"message": "ok"})));
        let auth = AuthClient::new(transport, memory_store(None));

        let err = auth.refresh(Some("R1")).await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshFailed(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let transport = ScriptedTransport::new(|_| panic!("no request expected"));
        let store = memory_store(Some(alice()));
        let auth = AuthClient::new(transport, store.clone());

        auth.logout().unwrap();
        assert!(store.load().is_empty());
        auth.logout().unwrap();
    }
}
