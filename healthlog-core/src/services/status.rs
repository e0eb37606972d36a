//! Status service - row counts and database summary

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::ports::Repository;

/// Status service for database summaries
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let counts = self.repository.counts()?;
        let latest_post = self
            .repository
            .recent_posts(1)?
            .into_iter()
            .next()
            .and_then(|p| p.timestamp)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string());

        Ok(StatusSummary {
            total_users: counts.users,
            total_bmi_results: counts.bmi_results,
            total_posts: counts.posts,
            orphaned_posts: counts.orphaned_posts,
            latest_post,
            database_path: self
                .repository
                .db_path()
                .map(|p| p.display().to_string()),
            database_size: self.repository.db_size()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_bmi_results: i64,
    pub total_posts: i64,
    pub orphaned_posts: i64,
    pub latest_post: Option<String>,
    pub database_path: Option<String>,
    pub database_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Post, User};
    use crate::services::Session;

    #[test]
    fn test_status_counts() {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();

        let mut session = Session::new(repo.clone());
        session.add(User::new("alice", "digest", "a@x.com", "Alice", "A"));
        session.add(Post::new("anon", "post"));
        session.commit().unwrap();

        let status = StatusService::new(repo).get_status().unwrap();
        assert_eq!(status.total_users, 1);
        assert_eq!(status.total_bmi_results, 0);
        assert_eq!(status.total_posts, 1);
        assert_eq!(status.orphaned_posts, 1);
        assert!(status.latest_post.is_some());
        assert!(status.database_path.is_none());
        assert!(status.database_size.is_none());
    }
}
