//! Per-session persistence boundary.
//!
//! A store only moves records in and out. It never validates the position it
//! holds; that is the executor's job when it loads one.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::StoreError;
use crate::models::GameSession;

mod file;

pub use file::FileStore;

/// Key-to-record store, one record per session id
///
/// Sessions are independent; there is no cross-session locking. Callers must
/// `save` after every mutation or the stored record falls behind.
pub trait SessionStore: Send + Sync {
    /// Stored record, or a freshly initialised session if there is none
    fn load(&self, session_id: &str) -> Result<GameSession, StoreError>;

    fn save(&self, session_id: &str, session: &GameSession) -> Result<(), StoreError>;
}

/// In-process store, lost on restart
///
/// Records are never evicted. Every id that gets saved stays until the
/// process exits.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, GameSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<GameSession, StoreError> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    fn save(&self, session_id: &str, session: &GameSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session_id.to_string(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_loads_fresh() {
        let store = MemoryStore::new();
        assert_eq!(store.load("nobody").unwrap(), GameSession::new());
        assert!(store.is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = MemoryStore::new();
        let mut first = GameSession::new();
        first.move_history.push("e4".to_string());
        store.save("a", &first).unwrap();

        assert_eq!(store.load("a").unwrap().move_history, vec!["e4"]);
        assert!(store.load("b").unwrap().move_history.is_empty());
        assert_eq!(store.len(), 1);
    }
}
