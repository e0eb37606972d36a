//! Post service - creating, reading and editing posts

use crate::domain::result::{Error, Result};
use crate::domain::{Post, PostUpdate};
use crate::ports::{PostFilter, StagedWrite};

use super::Session;

/// Post operations over an explicit session
#[derive(Default)]
pub struct PostService;

impl PostService {
    pub fn new() -> Self {
        Self
    }

    /// Stage a new post
    pub fn create(&self, session: &mut Session, post: Post) -> Post {
        session.add(post.clone());
        post
    }

    pub fn get(&self, session: &Session, post_id: i64) -> Result<Post> {
        session
            .repository()
            .first_post(&PostFilter::Id(post_id))?
            .ok_or_else(|| Error::not_found(format!("post {}", post_id)))
    }

    /// Newest posts first
    pub fn recent(&self, session: &Session, limit: usize) -> Result<Vec<Post>> {
        session.repository().recent_posts(limit)
    }

    pub fn by_author(&self, session: &Session, user_id: i64) -> Result<Vec<Post>> {
        session
            .repository()
            .find_posts(&PostFilter::UserId(Some(user_id)))
    }

    /// Posts whose author was deleted
    pub fn orphaned(&self, session: &Session) -> Result<Vec<Post>> {
        session.repository().find_posts(&PostFilter::UserId(None))
    }

    /// Stage an edit of an existing post
    pub fn update(&self, session: &mut Session, post_id: i64, update: PostUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }
        self.get(session, post_id)?;
        session.add(StagedWrite::UpdatePost { post_id, update });
        Ok(())
    }

    /// Delete a post now (not staged); false if it did not exist
    pub fn delete(&self, session: &Session, post_id: i64) -> Result<bool> {
        session.repository().delete_post(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::User;
    use crate::ports::Repository;

    fn session_with_user() -> (Session, i64) {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let mut session = Session::new(Arc::new(repo));
        session.add(User::new("alice", "digest", "a@x.com", "Alice", "A"));
        let persisted = session.commit().unwrap();
        (session, persisted[0].as_user().unwrap().id.unwrap())
    }

    #[test]
    fn test_create_and_get() {
        let (mut session, user_id) = session_with_user();
        let service = PostService::new();

        service.create(&mut session, Post::new("Salad", "Greens and beans").by(user_id));
        let persisted = session.commit().unwrap();
        let post_id = persisted[0].as_post().unwrap().id.unwrap();

        let post = service.get(&session, post_id).unwrap();
        assert_eq!(post.title, "Salad");
        assert_eq!(post.user_id, Some(user_id));
        assert!(post.timestamp.is_some());
        assert!(post.image_url.is_none());
    }

    #[test]
    fn test_anonymous_post_is_orphaned() {
        let (mut session, user_id) = session_with_user();
        let service = PostService::new();

        service.create(&mut session, Post::new("Anon", "tip"));
        service.create(&mut session, Post::new("Mine", "tip").by(user_id));
        session.commit().unwrap();

        let orphaned = service.orphaned(&session).unwrap();
        assert_eq!(orphaned.len(), 1);
        assert_eq!(orphaned[0].title, "Anon");
        assert_eq!(service.by_author(&session, user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let (mut session, user_id) = session_with_user();
        let service = PostService::new();

        service.create(&mut session, Post::new("Draft", "v1").by(user_id));
        let post_id = session.commit().unwrap()[0].as_post().unwrap().id.unwrap();

        let update = PostUpdate {
            content: Some("v2".to_string()),
            ..Default::default()
        };
        service.update(&mut session, post_id, update).unwrap();
        session.commit().unwrap();

        let post = service.get(&session, post_id).unwrap();
        assert_eq!(post.content, "v2");
        assert_eq!(post.title, "Draft");

        assert!(service.delete(&session, post_id).unwrap());
        assert!(!service.delete(&session, post_id).unwrap());
        assert!(matches!(service.get(&session, post_id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_missing_post() {
        let (mut session, _) = session_with_user();
        let service = PostService::new();
        let update = PostUpdate {
            title: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&mut session, 99, update),
            Err(Error::NotFound(_))
        ));
    }
}
