//! Authenticated request gateway.
//!
//! Every task API call goes through `Gateway::call`, which attaches the
//! current access token, and on a 401 renews the token once and re-sends the
//! request. The sequence for one logical request is:
//!
//! 1. attach the stored access token (or none) and dispatch
//! 2. any non-401 response is returned unchanged
//! 3. on a 401, if the request has not been retried yet: mark it retried,
//!    renew the access token, re-attach, and dispatch again
//! 4. if renewal fails, clear the session and surface the original 401
//! 5. a 401 on the retried request is surfaced without another renewal
//!
//! Renewals are serialized: concurrent requests that fail with the same
//! stale token share one refresh call.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::SessionStore;

use super::auth::AuthClient;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

/// Refresh-and-retry cycles allowed per logical request.
const MAX_RETRIES: u32 = 1;

/// A request plus how many refresh-and-retry cycles it has used.
///
/// The wrapped request is never modified; each dispatch sends a copy with
/// the current token attached.
#[derive(Debug, Clone)]
pub struct AttemptedRequest {
    original: ApiRequest,
    retries: u32,
}

impl AttemptedRequest {
    pub fn new(original: ApiRequest) -> Self {
        Self {
            original,
            retries: 0,
        }
    }

    /// A request that has already used its retry.
    pub fn already_retried(original: ApiRequest) -> Self {
        Self {
            original,
            retries: MAX_RETRIES,
        }
    }

    pub fn original(&self) -> &ApiRequest {
        &self.original
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn can_retry(&self) -> bool {
        self.retries < MAX_RETRIES
    }

    fn mark_retried(&mut self) {
        self.retries += 1;
    }
}

pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    auth: AuthClient,
    refresh_lock: Mutex<()>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        let auth = AuthClient::new(transport.clone(), store.clone());
        Self {
            transport,
            store,
            auth,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Perform one logical request under the current session.
    pub async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.call_attempt(AttemptedRequest::new(request)).await
    }

    /// Perform a request that may already have used its retry.
    pub async fn call_attempt(&self, mut attempt: AttemptedRequest) -> Result<ApiResponse, ApiError> {
        let (response, sent_token) = self.dispatch(&attempt).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        if !attempt.can_retry() {
            warn!(path = %attempt.original.path, "Authorization failed after retry");
            return self.expire(response);
        }
        attempt.mark_retried();

        match self.renew_access_token(sent_token.as_deref()).await {
            Ok(()) => {}
            // Transport trouble is not a verdict on the refresh token
            Err(ApiError::Network(e)) => return Err(ApiError::Network(e)),
            Err(e) => {
                // The session was already cleared under the refresh lock
                warn!(error = %e, path = %attempt.original.path, "Token refresh failed");
                return Err(ApiError::SessionExpired(response));
            }
        }

        let (retried, _) = self.dispatch(&attempt).await?;
        if retried.is_unauthorized() {
            warn!(path = %attempt.original.path, "Authorization failed after retry");
            return self.expire(retried);
        }
        Ok(retried)
    }

    /// Attach the stored token and send. Returns the token that was sent.
    async fn dispatch(
        &self,
        attempt: &AttemptedRequest,
    ) -> Result<(ApiResponse, Option<String>), ApiError> {
        let token = self.store.current_access_token();
        let request = attempt.original.with_bearer(token.clone());
        debug!(
            method = %request.method,
            path = %request.path,
            retries = attempt.retries,
            authenticated = token.is_some(),
            "Dispatching request"
        );
        let response = self.transport.send(request).await?;
        Ok((response, token))
    }

    /// Make sure the stored access token is newer than `rejected`.
    ///
    /// If another request already renewed the token while this one waited
    /// for the lock, no refresh call is made. The store is re-read once the
    /// refresh call returns, and the new token is only written if the session
    /// it belongs to is still the stored one. A failed refresh clears the
    /// session before the lock is released.
    async fn renew_access_token(&self, rejected: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let session = self.store.load();
        if session.access_token.is_some() && session.access_token.as_deref() != rejected {
            debug!("Access token already renewed by a concurrent request");
            return Ok(());
        }

        let refreshed = self.auth.refresh(session.refresh_token.as_deref()).await;

        // Logout or login may have replaced the session while the refresh was in flight
        let current = self.store.load();
        let unchanged = current.refresh_token == session.refresh_token
            && current.access_token == session.access_token;

        match refreshed {
            Err(e @ ApiError::Network(_)) => Err(e),
            Ok(access_token) if unchanged && current.is_fully_populated() => {
                self.store.save(&current.with_access_token(access_token))?;
                Ok(())
            }
            Err(e) if unchanged => {
                self.clear_session();
                Err(e)
            }
            _ if current.is_authenticated => {
                debug!("Session replaced during refresh, discarding refreshed token");
                Ok(())
            }
            _ => {
                debug!("Session cleared during refresh, discarding refreshed token");
                Err(ApiError::InvalidRefreshToken)
            }
        }
    }

    /// Clear the session and report the rejected request.
    fn expire(&self, response: ApiResponse) -> Result<ApiResponse, ApiError> {
        self.clear_session();
        Err(ApiError::SessionExpired(response))
    }

    /// A failed clear is logged, never allowed to mask the authorization failure.
    fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
    }
}
