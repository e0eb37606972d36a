//! Repository port - persistence abstraction

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{BmiResult, Post, PostRetention, PostUpdate, ProfileUpdate, User};

/// Exact-match user lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(i64),
    /// Case-sensitive
    Username(String),
    Email(String),
}

/// Exact-match BMI result lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BmiFilter {
    Id(i64),
    UserId(i64),
    HealthCondition(String),
}

/// Exact-match post lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    Id(i64),
    /// `UserId(None)` matches posts without an author
    UserId(Option<i64>),
    Title(String),
}

/// A change queued in a session, applied on commit
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    InsertUser(User),
    InsertBmiResult(BmiResult),
    InsertPost(Post),
    UpdateProfile { user_id: i64, update: ProfileUpdate },
    UpdatePassword { user_id: i64, digest: String },
    UpdatePost { post_id: i64, update: PostUpdate },
}

impl From<User> for StagedWrite {
    fn from(user: User) -> Self {
        Self::InsertUser(user)
    }
}

impl From<BmiResult> for StagedWrite {
    fn from(result: BmiResult) -> Self {
        Self::InsertBmiResult(result)
    }
}

impl From<Post> for StagedWrite {
    fn from(post: Post) -> Self {
        Self::InsertPost(post)
    }
}

/// Outcome of one staged write after commit, in staging order
#[derive(Debug, Clone, PartialEq)]
pub enum Persisted {
    /// Inserted row with its assigned id
    User(User),
    BmiResult(BmiResult),
    Post(Post),
    /// Update of an existing row; `found` is false when no row matched
    Updated { table: &'static str, id: i64, found: bool },
}

impl Persisted {
    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_bmi_result(&self) -> Option<&BmiResult> {
        match self {
            Self::BmiResult(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }
}

/// What a user deletion removed or detached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserDeletion {
    pub user_deleted: bool,
    pub bmi_results_deleted: usize,
    pub posts_orphaned: usize,
    pub posts_deleted: usize,
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub users: i64,
    pub bmi_results: i64,
    pub posts: i64,
    pub orphaned_posts: i64,
}

/// Database repository abstraction
///
/// Reads see committed state only. Inserts and updates go through
/// `apply` as one atomic batch; deletes run immediately.
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Create tables and run pending migrations
    fn ensure_schema(&self) -> Result<()>;

    // === Staged writes ===

    /// Apply a batch of staged writes atomically
    fn apply(&self, writes: &[StagedWrite]) -> Result<Vec<Persisted>>;

    // === Users ===

    /// All users matching the filter, ordered by id
    fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

    /// First user matching the filter (lowest id)
    fn first_user(&self, filter: &UserFilter) -> Result<Option<User>> {
        Ok(self.find_users(filter)?.into_iter().next())
    }

    fn list_users(&self) -> Result<Vec<User>>;

    /// Delete a user, its BMI results, and detach or delete its posts
    fn delete_user(&self, user_id: i64, retention: PostRetention) -> Result<UserDeletion>;

    // === BMI results ===

    fn find_bmi_results(&self, filter: &BmiFilter) -> Result<Vec<BmiResult>>;

    fn first_bmi_result(&self, filter: &BmiFilter) -> Result<Option<BmiResult>> {
        Ok(self.find_bmi_results(filter)?.into_iter().next())
    }

    // === Posts ===

    fn find_posts(&self, filter: &PostFilter) -> Result<Vec<Post>>;

    fn first_post(&self, filter: &PostFilter) -> Result<Option<Post>> {
        Ok(self.find_posts(filter)?.into_iter().next())
    }

    /// Newest posts first
    fn recent_posts(&self, limit: usize) -> Result<Vec<Post>>;

    /// Returns false when no post had that id
    fn delete_post(&self, post_id: i64) -> Result<bool>;

    // === Maintenance ===

    fn counts(&self) -> Result<TableCounts>;

    /// Ids of BMI results whose user no longer exists
    fn orphaned_bmi_results(&self) -> Result<Vec<i64>>;
}
