//! The session store: an ordered collection of named conversations.
//!
//! Display order is newest first. All history handed out across the
//! store boundary is copied, never aliased, so callers can never corrupt
//! stored turns through a returned list.

use banter_common::{SessionId, StoreError};
use tracing::info;

use crate::Turn;

use super::backend::{MemoryBackend, SessionRecord, StoreBackend};

/// One named conversation.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: SessionId,
    name: String,
    turns: Vec<Turn>,
}

impl ChatSession {
    fn with_name(name: String) -> Self {
        Self {
            id: SessionId::new(),
            name,
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

/// Ordered session collection over a pluggable backing store.
pub struct SessionStore {
    /// Display order, newest first.
    sessions: Vec<ChatSession>,
    active: Option<SessionId>,
    backend: Box<dyn StoreBackend>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            backend,
        }
    }

    /// A store over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Start a new session, make it active, and return its handle.
    pub fn create_session(&mut self) -> SessionId {
        let name = format!("Chat {}", self.sessions.len() + 1);
        let session = ChatSession::with_name(name);
        let id = session.id;
        self.sessions.insert(0, session);
        self.active = Some(id);
        id
    }

    /// Make `id` the active session and return a copy of its turns.
    pub fn switch_session(&mut self, id: SessionId) -> Result<Vec<Turn>, StoreError> {
        let session = self
            .sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::UnknownSession(id.to_string()))?;
        let turns = session.turns.clone();
        self.active = Some(id);
        Ok(turns)
    }

    /// Append one turn to the named session's history.
    pub fn append_turn(&mut self, id: SessionId, turn: Turn) -> Result<(), StoreError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::UnknownSession(id.to_string()))?;
        session.turns.push(turn);
        Ok(())
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.active
            .and_then(|id| self.sessions.iter().find(|s| s.id == id))
    }

    /// Every session in display order, newest first.
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Write the full collection through the backend.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let records: Vec<SessionRecord> = self
            .sessions
            .iter()
            .map(|s| SessionRecord {
                name: s.name.clone(),
                messages: s.turns.clone(),
            })
            .collect();
        self.backend.save(&records).await
    }

    /// Replace in-memory state from the backing store.
    ///
    /// An empty store materializes one default session and persists it,
    /// so there is never a state with zero sessions. The newest session
    /// becomes active.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let records = self.backend.load().await?;
        self.sessions = records
            .into_iter()
            .map(|record| ChatSession {
                id: SessionId::new(),
                name: record.name,
                turns: record.messages,
            })
            .collect();

        if self.sessions.is_empty() {
            self.create_session();
            self.persist().await?;
            info!("empty store, created default session");
        } else {
            self.active = Some(self.sessions[0].id);
            info!(sessions = self.sessions.len(), "loaded sessions");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::backend::{FileBackend, MemoryBackend, StoreBackend};
    use super::*;

    #[test]
    fn created_sessions_are_unique_and_newest_first() {
        let mut store = SessionStore::in_memory();
        let ids: Vec<_> = (0..4).map(|_| store.create_session()).collect();

        let names: Vec<_> = store.sessions().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["Chat 4", "Chat 3", "Chat 2", "Chat 1"]);
        assert!(store.sessions().iter().all(|s| s.turns().is_empty()));

        // Handles are unique and the latest one is active.
        let unique: std::collections::HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(store.active_id(), Some(ids[3]));
    }

    #[test]
    fn switch_returns_an_isolated_copy() {
        let mut store = SessionStore::in_memory();
        let id = store.create_session();
        store.append_turn(id, Turn::user("original")).unwrap();

        let mut copy = store.switch_session(id).unwrap();
        copy.push(Turn::assistant("injected"));
        copy[0] = Turn::user("mangled");

        let stored = store.active().unwrap().turns();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], Turn::user("original"));
    }

    #[test]
    fn switch_marks_active() {
        let mut store = SessionStore::in_memory();
        let first = store.create_session();
        let second = store.create_session();
        assert_eq!(store.active_id(), Some(second));

        store.switch_session(first).unwrap();
        assert_eq!(store.active_id(), Some(first));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut store = SessionStore::in_memory();
        store.create_session();

        let stranger = SessionId::new();
        assert!(matches!(
            store.switch_session(stranger),
            Err(StoreError::UnknownSession(_))
        ));
        assert!(matches!(
            store.append_turn(stranger, Turn::user("x")),
            Err(StoreError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn round_trips_through_memory_backend() {
        let backend = MemoryBackend::new();
        let mut store = SessionStore::new(Box::new(backend.clone()));
        let first = store.create_session();
        store.append_turn(first, Turn::user("hello")).unwrap();
        store.append_turn(first, Turn::assistant("hi there")).unwrap();
        store.create_session();
        store.persist().await.unwrap();

        let mut reloaded = SessionStore::new(Box::new(backend));
        reloaded.load().await.unwrap();

        let names: Vec<_> = reloaded.sessions().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Chat 2", "Chat 1"]);
        assert!(reloaded.sessions()[0].turns().is_empty());
        assert_eq!(
            reloaded.sessions()[1].turns(),
            &[Turn::user("hello"), Turn::assistant("hi there")]
        );
        assert_eq!(reloaded.active_id(), Some(reloaded.sessions()[0].id()));
    }

    #[tokio::test]
    async fn round_trips_through_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let mut store = SessionStore::new(Box::new(FileBackend::new(&path)));
        let id = store.create_session();
        store
            .append_turn(id, Turn::user("what is rust?"))
            .unwrap();
        store
            .append_turn(id, Turn::assistant("a systems language"))
            .unwrap();
        store.persist().await.unwrap();

        let mut reloaded = SessionStore::new(Box::new(FileBackend::new(&path)));
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.sessions().len(), 1);
        assert_eq!(reloaded.sessions()[0].name(), "Chat 1");
        assert_eq!(reloaded.sessions()[0].turns().len(), 2);
    }

    #[tokio::test]
    async fn empty_store_materializes_one_default_session() {
        let backend = MemoryBackend::new();
        let mut store = SessionStore::new(Box::new(backend.clone()));
        store.load().await.unwrap();

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].name(), "Chat 1");
        assert!(store.active_id().is_some());

        // The default session was persisted, not just held in memory.
        assert_eq!(backend.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_numbering_continues_after_load() {
        let backend = MemoryBackend::new();
        let mut store = SessionStore::new(Box::new(backend.clone()));
        store.create_session();
        store.create_session();
        store.persist().await.unwrap();

        let mut reloaded = SessionStore::new(Box::new(backend));
        reloaded.load().await.unwrap();
        reloaded.create_session();
        assert_eq!(reloaded.sessions()[0].name(), "Chat 3");
    }
}
