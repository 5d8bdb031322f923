//! Session lifecycle: the session record and where it is persisted.
//!
//! This module provides:
//! - `Session`: the authentication state (identity, access and refresh tokens)
//! - `SessionStore`: the single owner of the persisted session
//! - `KeyValueStore` backends: file, OS keychain, and in-memory

pub mod session;
pub mod storage;
pub mod store;

pub use session::Session;
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};
pub use store::SessionStore;
