//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Constraint violations raised by the store are classified into their own
/// variants so callers can tell a duplicate username apart from an I/O
/// failure. Authentication failure is not an error: see `AuthOutcome`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Uniqueness violation on {field}")]
    UniqueViolation { field: String },

    #[error("Missing required field {field}")]
    NotNullViolation { field: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short variant name, safe to log (carries no user data)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::UniqueViolation { .. } => "unique_violation",
            Self::NotNullViolation { .. } => "not_null_violation",
            Self::ForeignKeyViolation(_) => "foreign_key_violation",
            Self::Credential(_) => "credential",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// True for any storage-level constraint rejection
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation { .. } | Self::NotNullViolation { .. } | Self::ForeignKeyViolation(_)
        )
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        classify_database_error(&err.to_string())
    }
}

/// Map a DuckDB error message onto the error taxonomy.
///
/// DuckDB reports constraint failures as text only. A duplicate of a
/// committed row names the column:
/// `Constraint Error: Duplicate key "username: alice" violates unique constraint`.
/// A duplicate within the same transaction only carries the value:
/// `Constraint Error: PRIMARY KEY or UNIQUE constraint violation: duplicate key "alice"`.
/// The field is `unknown` in the second case; the adapter resolves it.
pub(crate) fn classify_database_error(msg: &str) -> Error {
    // ASCII lowering keeps byte offsets aligned with `msg`
    let lower = msg.to_ascii_lowercase();

    if let Some(start) = lower.find("duplicate key \"") {
        let key = &msg[start + "duplicate key \"".len()..];
        let key = key.split_once('"').map_or(key, |(key, _)| key);
        let field = key
            .split_once(':')
            .map(|(field, _)| field.trim())
            .filter(|field| is_column_name(field))
            .unwrap_or(UNKNOWN_FIELD)
            .to_string();
        return Error::UniqueViolation { field };
    }

    if lower.contains("not null constraint failed") {
        // "NOT NULL constraint failed: users.email"
        let field = msg
            .rsplit_once(':')
            .map(|(_, column)| column.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return Error::NotNullViolation { field };
    }

    if lower.contains("foreign key") {
        return Error::ForeignKeyViolation(msg.to_string());
    }

    Error::Database(msg.to_string())
}

/// Placeholder field for a unique violation whose column is not in the message
pub(crate) const UNKNOWN_FIELD: &str = "unknown";

fn is_column_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_duplicate_key() {
        let err = classify_database_error(
            "Constraint Error: Duplicate key \"username: alice\" violates unique constraint.",
        );
        match err {
            Error::UniqueViolation { field } => assert_eq!(field, "username"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_duplicate_key_within_transaction() {
        let err = classify_database_error(
            "Constraint Error: PRIMARY KEY or UNIQUE constraint violation: duplicate key \"alice\"",
        );
        match err {
            Error::UniqueViolation { field } => assert_eq!(field, UNKNOWN_FIELD),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_duplicate_key_value_with_colon() {
        let err = classify_database_error(
            "Constraint Error: PRIMARY KEY or UNIQUE constraint violation: duplicate key \"a b: c\"",
        );
        match err {
            Error::UniqueViolation { field } => assert_eq!(field, UNKNOWN_FIELD),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_not_null() {
        let err = classify_database_error("Constraint Error: NOT NULL constraint failed: users.email");
        match err {
            Error::NotNullViolation { field } => assert_eq!(field, "users.email"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_foreign_key() {
        let err = classify_database_error(
            "Constraint Error: Violates foreign key constraint because key \"id: 99\" does not exist in the referenced table",
        );
        assert!(matches!(err, Error::ForeignKeyViolation(_)));
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_kind_omits_values() {
        let err = classify_database_error("Constraint Error: Duplicate key \"email: a@x.com\" violates unique constraint.");
        assert_eq!(err.kind(), "unique_violation");
        assert!(!err.to_string().contains("a@x.com"));
    }

    #[test]
    fn test_classify_other() {
        let err = classify_database_error("IO Error: Could not set lock on file");
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_display() {
        let err = Error::UniqueViolation { field: "email".to_string() };
        assert_eq!(err.to_string(), "Uniqueness violation on email");
    }
}
