//! Session - explicit persistence context with staged writes
//!
//! Every service operation takes a session instead of reaching for global
//! state. Inserts and updates are queued with `add` and only reach the
//! database on `commit`, which applies the whole batch atomically.

use std::sync::Arc;

use crate::domain::result::Result;
use crate::ports::{Persisted, Repository, StagedWrite};

/// A unit of work against a repository
pub struct Session {
    repository: Arc<dyn Repository>,
    pending: Vec<StagedWrite>,
}

impl Session {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            pending: Vec::new(),
        }
    }

    /// Queue a write; nothing touches the database until `commit`
    pub fn add(&mut self, write: impl Into<StagedWrite>) {
        self.pending.push(write.into());
    }

    /// Writes queued since the last commit or rollback
    pub fn pending(&self) -> &[StagedWrite] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply all pending writes in one transaction
    ///
    /// Returns one `Persisted` per staged write, in staging order. On failure
    /// nothing is persisted and the pending set is discarded.
    pub fn commit(&mut self) -> Result<Vec<Persisted>> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        self.repository.apply(&pending)
    }

    /// Discard pending writes, returning how many were dropped
    pub fn rollback(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Committed-state reads
    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{Post, User};
    use crate::ports::UserFilter;

    fn session() -> Session {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        Session::new(Arc::new(repo))
    }

    #[test]
    fn test_add_does_not_write() {
        let mut session = session();
        session.add(User::new("alice", "digest", "a@x.com", "Alice", "A"));

        assert!(session.has_pending());
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.repository().counts().unwrap().users, 0);
    }

    #[test]
    fn test_commit_applies_in_order() {
        let mut session = session();
        session.add(User::new("alice", "digest", "a@x.com", "Alice", "A"));
        session.add(Post::new("hello", "world"));

        let persisted = session.commit().unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted[0].as_user().unwrap().id.is_some());
        assert!(persisted[1].as_post().unwrap().timestamp.is_some());
        assert!(!session.has_pending());

        let alice = session
            .repository()
            .first_user(&UserFilter::Username("alice".to_string()))
            .unwrap();
        assert!(alice.is_some());
    }

    #[test]
    fn test_commit_empty_is_noop() {
        let mut session = session();
        assert!(session.commit().unwrap().is_empty());
    }

    #[test]
    fn test_failed_commit_clears_pending_and_persists_nothing() {
        let mut session = session();
        session.add(User::new("alice", "d1", "a@x.com", "Alice", "A"));
        session.add(User::new("alice", "d2", "other@x.com", "Alice", "B"));

        assert!(session.commit().is_err());
        assert!(!session.has_pending());
        assert_eq!(session.repository().counts().unwrap().users, 0);
    }

    #[test]
    fn test_rollback_discards() {
        let mut session = session();
        session.add(Post::new("a", "b"));
        session.add(Post::new("c", "d"));

        assert_eq!(session.rollback(), 2);
        assert!(session.commit().unwrap().is_empty());
        assert_eq!(session.repository().counts().unwrap().posts, 0);
    }
}
