use std::sync::Arc;

use tracing::{debug, warn};

use super::session::Session;
use super::storage::{KeyValueStore, StoreError};

/// Well-known key the session record is stored under
pub const SESSION_KEY: &str = "user";

/// Sole owner of the persisted session.
///
/// All credential reads and writes go through here. Writes always replace the
/// whole record; there is no per-field update.
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            key: SESSION_KEY.to_string(),
        }
    }

    /// Load the persisted session.
    ///
    /// Missing, unreadable, malformed, or partial records all load as the
    /// empty session.
    pub fn load(&self) -> Session {
        let contents = match self.backend.get(&self.key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Session::empty(),
            Err(e) => {
                warn!(error = %e, "Failed to read session, treating as logged out");
                return Session::empty();
            }
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) if session.is_consistent() => session,
            Ok(_) => {
                warn!("Stored session is partially populated, ignoring it");
                Session::empty()
            }
            Err(e) => {
                warn!(error = %e, "Stored session is malformed, ignoring it");
                Session::empty()
            }
        }
    }

    /// Replace the persisted session.
    ///
    /// Saving the empty session clears the record. A partially populated
    /// session is rejected and the stored record is left as it was.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        if session.is_empty() {
            return self.clear();
        }
        if !session.is_fully_populated() {
            warn!(user = session.display_name(), "Not saving partially populated session");
            return Err(StoreError::PartialSession);
        }
        let contents = serde_json::to_string(session)?;
        self.backend.set(&self.key, &contents)?;
        debug!(user = session.display_name(), "Session saved");
        Ok(())
    }

    /// Remove the persisted session. Safe to call when nothing is stored.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)?;
        debug!("Session cleared");
        Ok(())
    }

    pub fn current_access_token(&self) -> Option<String> {
        self.load().access_token
    }

    pub fn current_refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    pub fn is_authenticated(&self) -> bool {
        self.load().is_authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{FileStore, MemoryStore};

    fn memory_store() -> (Arc<MemoryStore>, SessionStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = SessionStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn test_load_without_record_is_empty() {
        let (_, store) = memory_store();
        assert!(store.load().is_empty());
        assert_eq!(store.current_access_token(), None);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_, store) = memory_store();
        let session = Session::authenticated(1, "alice", "A1", "R1");
        store.save(&session).unwrap();
        assert_eq!(store.load(), session);
        assert_eq!(store.current_access_token().as_deref(), Some("A1"));
        assert_eq!(store.current_refresh_token().as_deref(), Some("R1"));

        store.save(&Session::empty()).unwrap();
        assert_eq!(store.load(), Session::empty());
    }

    #[test]
    fn test_malformed_record_loads_as_empty() {
        let (backend, store) = memory_store();
        backend.set(SESSION_KEY, "{not json").unwrap();
        assert!(store.load().is_empty());

        backend.set(SESSION_KEY, "[1, 2, 3]").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_partial_record_loads_as_empty() {
        let (backend, store) = memory_store();
        backend
            .set(
                SESSION_KEY,
                r#"{"user_id": 1, "username": "alice", "access_token": null, "refresh_token": "R1", "is_authenticated": true}"#,
            )
            .unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_rejects_partial_session() {
        let (backend, store) = memory_store();
        let session = Session::authenticated(1, "alice", "A1", "R1");
        store.save(&session).unwrap();

        let mut partial = session.clone();
        partial.refresh_token = None;
        assert!(matches!(store.save(&partial), Err(StoreError::PartialSession)));

        let mut unflagged = session.clone();
        unflagged.is_authenticated = false;
        assert!(matches!(store.save(&unflagged), Err(StoreError::PartialSession)));

        // The previous record is untouched
        assert_eq!(store.load(), session);
        assert!(backend.get(SESSION_KEY).unwrap().is_some());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (backend, store) = memory_store();
        store
            .save(&Session::authenticated(1, "alice", "A1", "R1"))
            .unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
        assert_eq!(backend.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_session_survives_new_store_instance() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::authenticated(7, "bob", "A7", "R7");

        let first = SessionStore::new(Arc::new(FileStore::new(tmp.path())));
        first.save(&session).unwrap();

        // A fresh process reading the same directory sees the same session
        let second = SessionStore::new(Arc::new(FileStore::new(tmp.path())));
        assert_eq!(second.load(), session);
    }
}
