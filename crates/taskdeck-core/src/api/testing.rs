//! Scripted transport for unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::auth::{MemoryStore, Session, SessionStore};

type Responder = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Answers every request through a closure and records what it was sent.
///
/// Each `send` yields to the scheduler once before answering, so concurrent
/// callers really do interleave.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            (self.responder)(&request)
        })
    }
}

pub fn ok(body: serde_json::Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(200, body.to_string()))
}

pub fn status(code: u16, body: serde_json::Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(code, body.to_string()))
}

pub fn unauthorized() -> Result<ApiResponse, TransportError> {
    status(401, serde_json::json!({"message": "Token has expired"}))
}

/// Session store over memory, optionally pre-populated.
pub fn memory_store(session: Option<Session>) -> Arc<SessionStore> {
    let store = SessionStore::new(Arc::new(MemoryStore::new()));
    if let Some(session) = session {
        store.save(&session).unwrap();
    }
    Arc::new(store)
}

pub fn alice() -> Session {
    Session::authenticated(1, "alice", "A1", "R1")
}
