//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike, Utc};
use duckdb::types::ToSql;
use duckdb::{params, Connection, Row};

use crate::domain::result::{Error, Result, UNKNOWN_FIELD};
use crate::domain::{
    BmiResult, Post, PostRetention, PostUpdate, ProfileUpdate, User, DEFAULT_IMAGE_URL,
};
use crate::ports::{
    BmiFilter, Persisted, PostFilter, Repository, StagedWrite, TableCounts, UserDeletion,
    UserFilter,
};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str = "id, username, password, email, first_name, last_name, image_url";

// Timestamps are read back as VARCHAR and parsed in Rust
const BMI_COLUMNS: &str = "id, user_id, age, weight, height, bmi, health_condition,
                           CAST(result_date AS VARCHAR)";

const POST_COLUMNS: &str = "id, title, content, image_url, CAST(\"timestamp\" AS VARCHAR), user_id";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock")
}

/// DuckDB repository implementation
///
/// One connection per process behind a mutex; every call holds the lock
/// for its whole duration.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff on file locking errors, which occur
    /// when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[healthlog] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database, gone when the repository is dropped
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Disable extension autoloading: nothing here needs extensions, and
        // cached ones in ~/.duckdb/extensions can fail code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run pending migrations, reporting what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Path of the backing file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Size of the backing file in bytes
    pub fn db_size(&self) -> Result<Option<u64>> {
        match &self.db_path {
            Some(path) => Ok(Some(std::fs::metadata(path)?.len())),
            None => Ok(None),
        }
    }

    // === Row mapping ===

    fn select_users(conn: &Connection, clause: &str, params: &[&dyn ToSql]) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users {} ORDER BY id", USER_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params, row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn select_bmi_results(
        conn: &Connection,
        clause: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<BmiResult>> {
        let sql = format!("SELECT {} FROM bmi_results {} ORDER BY id", BMI_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params, row_to_bmi_result)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    fn select_posts(conn: &Connection, clause: &str, params: &[&dyn ToSql]) -> Result<Vec<Post>> {
        let sql = format!("SELECT {} FROM posts {}", POST_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params, row_to_post)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    // === Staged write application (runs inside the commit transaction) ===

    fn apply_one(conn: &Connection, write: &StagedWrite) -> Result<Persisted> {
        match write {
            StagedWrite::InsertUser(user) => Self::insert_user(conn, user).map(Persisted::User),
            StagedWrite::InsertBmiResult(result) => {
                Self::insert_bmi_result(conn, result).map(Persisted::BmiResult)
            }
            StagedWrite::InsertPost(post) => Self::insert_post(conn, post).map(Persisted::Post),
            StagedWrite::UpdateProfile { user_id, update } => {
                let found = Self::update_profile(conn, *user_id, update)?;
                Ok(Persisted::Updated { table: "users", id: *user_id, found })
            }
            StagedWrite::UpdatePassword { user_id, digest } => {
                let changed = conn.execute(
                    "UPDATE users SET password = ? WHERE id = ?",
                    params![digest, user_id],
                )?;
                Ok(Persisted::Updated { table: "users", id: *user_id, found: changed > 0 })
            }
            StagedWrite::UpdatePost { post_id, update } => {
                let found = Self::update_post(conn, *post_id, update)?;
                Ok(Persisted::Updated { table: "posts", id: *post_id, found })
            }
        }
    }

    fn insert_user(conn: &Connection, user: &User) -> Result<User> {
        let image_url = user
            .image_url
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string());

        let id: i64 = conn.query_row(
            "INSERT INTO users (username, password, email, first_name, last_name, image_url)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
            params![
                user.username,
                user.password,
                user.email,
                user.first_name,
                user.last_name,
                image_url,
            ],
            |row| row.get(0),
        )?;

        Ok(User {
            id: Some(id),
            image_url: Some(image_url),
            ..user.clone()
        })
    }

    fn insert_bmi_result(conn: &Connection, result: &BmiResult) -> Result<BmiResult> {
        // Stamped per insert, never shared between rows
        let result_date = result.result_date.unwrap_or_else(now_stamp);

        let id: i64 = conn.query_row(
            "INSERT INTO bmi_results (user_id, age, weight, height, bmi, health_condition, result_date)
             VALUES (?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))
             RETURNING id",
            params![
                result.user_id,
                result.age,
                result.weight,
                result.height,
                result.bmi,
                result.health_condition,
                format_timestamp(&result_date),
            ],
            |row| row.get(0),
        )?;

        Ok(BmiResult {
            id: Some(id),
            result_date: Some(result_date),
            ..result.clone()
        })
    }

    fn insert_post(conn: &Connection, post: &Post) -> Result<Post> {
        if let Some(user_id) = post.user_id {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE id = ?",
                params![user_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(Error::ForeignKeyViolation(format!(
                    "posts.user_id {} does not reference an existing user",
                    user_id
                )));
            }
        }

        let timestamp = post.timestamp.unwrap_or_else(now_stamp);

        let id: i64 = conn.query_row(
            "INSERT INTO posts (title, content, image_url, \"timestamp\", user_id)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP), ?)
             RETURNING id",
            params![
                post.title,
                post.content,
                post.image_url,
                format_timestamp(&timestamp),
                post.user_id,
            ],
            |row| row.get(0),
        )?;

        Ok(Post {
            id: Some(id),
            timestamp: Some(timestamp),
            ..post.clone()
        })
    }

    fn update_profile(conn: &Connection, user_id: i64, update: &ProfileUpdate) -> Result<bool> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(first_name) = &update.first_name {
            sets.push("first_name = ?");
            values.push(first_name);
        }
        if let Some(last_name) = &update.last_name {
            sets.push("last_name = ?");
            values.push(last_name);
        }
        if let Some(image_url) = &update.image_url {
            sets.push("image_url = ?");
            values.push(image_url);
        }
        values.push(&user_id);

        Self::update_columns(conn, "users", &sets, &values, user_id)
    }

    fn update_post(conn: &Connection, post_id: i64, update: &PostUpdate) -> Result<bool> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(title) = &update.title {
            sets.push("title = ?");
            values.push(title);
        }
        if let Some(content) = &update.content {
            sets.push("content = ?");
            values.push(content);
        }
        if let Some(image_url) = &update.image_url {
            sets.push("image_url = ?");
            values.push(image_url);
        }
        values.push(&post_id);

        Self::update_columns(conn, "posts", &sets, &values, post_id)
    }

    /// `values` binds the SET clauses followed by the id.
    /// Returns whether a row with `id` exists in `table`.
    fn update_columns(
        conn: &Connection,
        table: &str,
        sets: &[&str],
        values: &[&dyn ToSql],
        id: i64,
    ) -> Result<bool> {
        if sets.is_empty() {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ?", table),
                params![id],
                |row| row.get(0),
            )?;
            return Ok(count > 0);
        }

        let sql = format!("UPDATE {} SET {} WHERE id = ?", table, sets.join(", "));
        let changed = conn.execute(&sql, values)?;
        Ok(changed > 0)
    }
}

impl Repository for DuckDbRepository {
    fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    fn apply(&self, writes: &[StagedWrite]) -> Result<Vec<Persisted>> {
        let mut conn = self.conn()?;
        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction()?;

        let mut persisted = Vec::with_capacity(writes.len());
        for (i, write) in writes.iter().enumerate() {
            let applied = Self::apply_one(&tx, write)
                .map_err(|err| resolve_batch_duplicate(err, write, &writes[..i]))?;
            persisted.push(applied);
        }

        tx.commit()?;
        Ok(persisted)
    }

    fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let conn = self.conn()?;
        match filter {
            UserFilter::Id(id) => Self::select_users(&conn, "WHERE id = ?", params![id]),
            UserFilter::Username(username) => {
                Self::select_users(&conn, "WHERE username = ?", params![username])
            }
            UserFilter::Email(email) => Self::select_users(&conn, "WHERE email = ?", params![email]),
        }
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        Self::select_users(&conn, "", params![])
    }

    /// Cascade delete of a user
    ///
    /// 1. Delete the user's BMI results
    /// 2. Clear (or delete, per retention) the user's posts
    /// 3. Delete the user
    ///
    /// Not wrapped in a transaction: DuckDB checks foreign keys eagerly inside
    /// transactions and rejects deleting a parent whose children were deleted
    /// earlier in the same transaction. Each statement auto-commits and the
    /// order keeps the foreign key satisfied. A failure in a later step
    /// leaves the earlier ones applied: if deleting the user row fails, the
    /// BMI results and post changes stay gone.
    fn delete_user(&self, user_id: i64, retention: PostRetention) -> Result<UserDeletion> {
        let conn = self.conn()?;

        let bmi_results_deleted =
            conn.execute("DELETE FROM bmi_results WHERE user_id = ?", params![user_id])?;

        let (posts_orphaned, posts_deleted) = match retention {
            PostRetention::Orphan => (
                conn.execute("UPDATE posts SET user_id = NULL WHERE user_id = ?", params![user_id])?,
                0,
            ),
            PostRetention::Delete => (
                0,
                conn.execute("DELETE FROM posts WHERE user_id = ?", params![user_id])?,
            ),
        };

        let users_deleted = conn.execute("DELETE FROM users WHERE id = ?", params![user_id])?;

        Ok(UserDeletion {
            user_deleted: users_deleted > 0,
            bmi_results_deleted,
            posts_orphaned,
            posts_deleted,
        })
    }

    fn find_bmi_results(&self, filter: &BmiFilter) -> Result<Vec<BmiResult>> {
        let conn = self.conn()?;
        match filter {
            BmiFilter::Id(id) => Self::select_bmi_results(&conn, "WHERE id = ?", params![id]),
            BmiFilter::UserId(user_id) => {
                Self::select_bmi_results(&conn, "WHERE user_id = ?", params![user_id])
            }
            BmiFilter::HealthCondition(condition) => {
                Self::select_bmi_results(&conn, "WHERE health_condition = ?", params![condition])
            }
        }
    }

    fn find_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        match filter {
            PostFilter::Id(id) => Self::select_posts(&conn, "WHERE id = ? ORDER BY id", params![id]),
            PostFilter::UserId(Some(user_id)) => {
                Self::select_posts(&conn, "WHERE user_id = ? ORDER BY id", params![user_id])
            }
            PostFilter::UserId(None) => {
                Self::select_posts(&conn, "WHERE user_id IS NULL ORDER BY id", params![])
            }
            PostFilter::Title(title) => {
                Self::select_posts(&conn, "WHERE title = ? ORDER BY id", params![title])
            }
        }
    }

    fn recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::select_posts(
            &conn,
            "ORDER BY \"timestamp\" DESC, id DESC LIMIT ?",
            params![limit],
        )
    }

    fn delete_post(&self, post_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM posts WHERE id = ?", params![post_id])?;
        Ok(deleted > 0)
    }

    fn counts(&self) -> Result<TableCounts> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

        Ok(TableCounts {
            users: count("SELECT COUNT(*) FROM users")?,
            bmi_results: count("SELECT COUNT(*) FROM bmi_results")?,
            posts: count("SELECT COUNT(*) FROM posts")?,
            orphaned_posts: count("SELECT COUNT(*) FROM posts WHERE user_id IS NULL")?,
        })
    }

    fn orphaned_bmi_results(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT b.id FROM bmi_results b
             LEFT JOIN users u ON b.user_id = u.id
             WHERE u.id IS NULL
             ORDER BY b.id",
        )?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

// Helper functions

fn row_to_user(row: &Row<'_>) -> duckdb::Result<User> {
    Ok(User {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        image_url: row.get(6)?,
    })
}

fn row_to_bmi_result(row: &Row<'_>) -> duckdb::Result<BmiResult> {
    let result_date: Option<String> = row.get(7)?;
    Ok(BmiResult {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        age: row.get(2)?,
        weight: row.get(3)?,
        height: row.get(4)?,
        bmi: row.get(5)?,
        health_condition: row.get(6)?,
        result_date: result_date.as_deref().and_then(parse_naive_datetime),
    })
}

fn row_to_post(row: &Row<'_>) -> duckdb::Result<Post> {
    let timestamp: Option<String> = row.get(4)?;
    Ok(Post {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        timestamp: timestamp.as_deref().and_then(parse_naive_datetime),
        user_id: row.get(5)?,
    })
}

/// Name the column of a unique violation DuckDB reported without one.
///
/// Duplicates within one transaction are reported by value only, so the
/// failing user is compared against the users staged before it.
fn resolve_batch_duplicate(err: Error, write: &StagedWrite, earlier: &[StagedWrite]) -> Error {
    let unresolved = matches!(&err, Error::UniqueViolation { field } if field == UNKNOWN_FIELD);
    let StagedWrite::InsertUser(user) = write else {
        return err;
    };
    if !unresolved {
        return err;
    }

    let earlier_users = earlier.iter().filter_map(|w| match w {
        StagedWrite::InsertUser(u) => Some(u),
        _ => None,
    });
    for other in earlier_users {
        if other.username == user.username {
            return Error::UniqueViolation { field: "username".to_string() };
        }
        if other.email == user.email {
            return Error::UniqueViolation { field: "email".to_string() };
        }
    }
    err
}

/// Current UTC time at the microsecond precision DuckDB stores
fn now_stamp() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse a DuckDB TIMESTAMP rendered as VARCHAR
/// ("2024-01-15 10:30:00" or "2024-01-15 10:30:00.123456")
fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn insert_user(repo: &DuckDbRepository, username: &str) -> User {
        let user = User::new(username, "digest", format!("{}@x.com", username), "First", "Last");
        let persisted = repo.apply(&[user.into()]).unwrap();
        persisted[0].as_user().unwrap().clone()
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name users does not exist"));
    }

    #[test]
    fn test_parse_naive_datetime() {
        let with_fraction = parse_naive_datetime("2024-01-15 10:30:00.123456").unwrap();
        assert_eq!(with_fraction.nanosecond(), 123_456_000);

        let without_fraction = parse_naive_datetime("2024-01-15 10:30:00").unwrap();
        assert_eq!(without_fraction.second(), 0);

        assert!(parse_naive_datetime("not a date").is_none());
    }

    #[test]
    fn test_timestamp_round_trips_at_microsecond_precision() {
        let stamp = now_stamp();
        assert_eq!(stamp.nanosecond() % 1_000, 0);
        assert_eq!(parse_naive_datetime(&format_timestamp(&stamp)), Some(stamp));
    }

    #[test]
    fn test_insert_assigns_id_and_default_image() {
        let repo = repo();
        let user = insert_user(&repo, "alice");

        assert!(user.id.is_some());
        assert_eq!(user.image_url.as_deref(), Some(DEFAULT_IMAGE_URL));

        let fetched = repo
            .first_user(&UserFilter::Username("alice".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn test_username_lookup_is_case_sensitive() {
        let repo = repo();
        insert_user(&repo, "alice");

        let upper = repo.first_user(&UserFilter::Username("Alice".to_string())).unwrap();
        assert!(upper.is_none());
    }

    #[test]
    fn test_bmi_timestamps_are_per_insert() {
        let repo = repo();
        let user = insert_user(&repo, "alice");
        let user_id = user.id.unwrap();

        let first = repo
            .apply(&[BmiResult::new(user_id, 30, 150, 65.0, 25.0, "Overweight").into()])
            .unwrap();
        thread::sleep(Duration::from_millis(5));
        let second = repo
            .apply(&[BmiResult::new(user_id, 30, 148, 65.0, 24.6, "Normal weight").into()])
            .unwrap();

        let first_date = first[0].as_bmi_result().unwrap().result_date.unwrap();
        let second_date = second[0].as_bmi_result().unwrap().result_date.unwrap();
        assert!(second_date > first_date);

        let stored = repo.find_bmi_results(&BmiFilter::UserId(user_id)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].result_date, Some(first_date));
    }

    #[test]
    fn test_duplicate_username_in_one_batch_names_the_field() {
        let repo = repo();
        let err = repo
            .apply(&[
                User::new("alice", "digest", "a@x.com", "Alice", "A").into(),
                User::new("alice", "digest", "b@x.com", "Alice", "B").into(),
            ])
            .unwrap_err();
        match err {
            Error::UniqueViolation { field } => assert_eq!(field, "username"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_email_in_one_batch_names_the_field() {
        let repo = repo();
        let err = repo
            .apply(&[
                User::new("alice", "digest", "same@x.com", "Alice", "A").into(),
                User::new("bob", "digest", "same@x.com", "Bob", "B").into(),
            ])
            .unwrap_err();
        match err {
            Error::UniqueViolation { field } => assert_eq!(field, "email"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_batch_duplicate_leaves_named_fields() {
        let user = User::new("alice", "digest", "a@x.com", "Alice", "A");
        let write: StagedWrite = user.clone().into();
        let earlier = [StagedWrite::from(user)];

        let named = Error::UniqueViolation { field: "email".to_string() };
        match resolve_batch_duplicate(named, &write, &earlier) {
            Error::UniqueViolation { field } => assert_eq!(field, "email"),
            other => panic!("unexpected error: {other:?}"),
        }

        let other = Error::database("boom");
        assert!(matches!(resolve_batch_duplicate(other, &write, &earlier), Error::Database(_)));
    }

    #[test]
    fn test_recent_posts_with_huge_limit() {
        let repo = repo();
        repo.apply(&[Post::new("t", "c").into()]).unwrap();

        let posts = repo.recent_posts(usize::MAX).unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn test_bmi_result_requires_existing_user() {
        let repo = repo();
        let err = repo
            .apply(&[BmiResult::new(999, 30, 150, 65.0, 25.0, "Overweight").into()])
            .unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation(_)), "got {err:?}");
    }

    #[test]
    fn test_post_requires_existing_author() {
        let repo = repo();
        let err = repo.apply(&[Post::new("t", "c").by(42).into()]).unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation(_)));
        assert_eq!(repo.counts().unwrap().posts, 0);
    }

    #[test]
    fn test_update_profile_and_missing_row() {
        let repo = repo();
        let user = insert_user(&repo, "alice");
        let user_id = user.id.unwrap();

        let update = ProfileUpdate {
            first_name: Some("Alicia".to_string()),
            ..Default::default()
        };
        let persisted = repo
            .apply(&[
                StagedWrite::UpdateProfile { user_id, update: update.clone() },
                StagedWrite::UpdateProfile { user_id: user_id + 100, update },
            ])
            .unwrap();

        assert_eq!(persisted[0], Persisted::Updated { table: "users", id: user_id, found: true });
        assert_eq!(
            persisted[1],
            Persisted::Updated { table: "users", id: user_id + 100, found: false }
        );

        let fetched = repo.first_user(&UserFilter::Id(user_id)).unwrap().unwrap();
        assert_eq!(fetched.first_name, "Alicia");
        assert_eq!(fetched.last_name, "Last");
    }

    #[test]
    fn test_recent_posts_newest_first() {
        let repo = repo();
        let user = insert_user(&repo, "alice");
        let user_id = user.id.unwrap();

        for title in ["one", "two", "three"] {
            repo.apply(&[Post::new(title, "body").by(user_id).into()]).unwrap();
        }

        let recent = repo.recent_posts(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "three");
        assert_eq!(recent[1].title, "two");
    }

    #[test]
    fn test_delete_with_post_retention_delete() {
        let repo = repo();
        let user = insert_user(&repo, "alice");
        let user_id = user.id.unwrap();
        repo.apply(&[Post::new("t", "c").by(user_id).into()]).unwrap();

        let deletion = repo.delete_user(user_id, PostRetention::Delete).unwrap();
        assert!(deletion.user_deleted);
        assert_eq!(deletion.posts_deleted, 1);
        assert_eq!(deletion.posts_orphaned, 0);
        assert_eq!(repo.counts().unwrap().posts, 0);
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let repo = repo();
        assert!(repo.db_path().is_none());
        assert_eq!(repo.db_size().unwrap(), None);
        assert!(repo.orphaned_bmi_results().unwrap().is_empty());
    }
}
