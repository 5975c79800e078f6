//! Database error classification.
//!
//! Driver errors are reclassified by SQLSTATE when the server supplied one,
//! and otherwise by matching known message signatures. Anything unmatched is
//! [`DbErrorKind::Other`], which surfaces as an internal error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    NotFound,
    Conflict,
    /// Foreign key, not-null or check constraint violation
    BadRequest,
    Forbidden,
    Timeout,
    Connection,
    Other,
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{op} failed ({kind}): {detail}")]
pub struct DbError {
    pub kind: DbErrorKind,
    /// Store operation, e.g. `accounts.find_by_email`
    pub op: &'static str,
    pub detail: String,
}

impl DbError {
    pub fn new(kind: DbErrorKind, op: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            op,
            detail: detail.into(),
        }
    }

    pub fn not_found(op: &'static str) -> Self {
        Self::new(DbErrorKind::NotFound, op, "no rows returned")
    }

    pub fn timeout(op: &'static str) -> Self {
        Self::new(DbErrorKind::Timeout, op, "deadline exceeded")
    }

    /// Classify a sqlx error raised by `op`.
    pub fn classify(op: &'static str, err: &sqlx::Error) -> Self {
        let kind = match err {
            sqlx::Error::RowNotFound => DbErrorKind::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => DbErrorKind::Connection,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DbErrorKind::Connection,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .and_then(|code| classify_sqlstate(&code))
                .or_else(|| classify_message(db_err.message()))
                .unwrap_or(DbErrorKind::Other),
            other => classify_message(&other.to_string()).unwrap_or(DbErrorKind::Other),
        };
        Self::new(kind, op, err.to_string())
    }
}

/// Map a PostgreSQL SQLSTATE code to a class.
pub fn classify_sqlstate(code: &str) -> Option<DbErrorKind> {
    match code {
        "23505" => Some(DbErrorKind::Conflict),
        "23503" | "23502" | "23514" => Some(DbErrorKind::BadRequest),
        "42501" => Some(DbErrorKind::Forbidden),
        "57014" => Some(DbErrorKind::Timeout),
        c if c.starts_with("08") => Some(DbErrorKind::Connection),
        "53300" => Some(DbErrorKind::Connection),
        _ => None,
    }
}

/// Fallback classification on the error text.
pub fn classify_message(message: &str) -> Option<DbErrorKind> {
    let msg = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

    if has(&["duplicate key", "unique constraint"]) {
        Some(DbErrorKind::Conflict)
    } else if has(&[
        "foreign key constraint",
        "null value",
        "not-null constraint",
        "check constraint",
    ]) {
        Some(DbErrorKind::BadRequest)
    } else if has(&["permission denied", "insufficient privilege"]) {
        Some(DbErrorKind::Forbidden)
    } else if has(&[
        "connection refused",
        "no connection available",
        "connection pool",
        "too many connections",
    ]) {
        Some(DbErrorKind::Connection)
    } else if has(&["timeout", "timed out", "deadline exceeded", "canceling statement"]) {
        Some(DbErrorKind::Timeout)
    } else {
        None
    }
}

/// Run a store future under a deadline; expiry becomes [`DbErrorKind::Timeout`].
pub async fn with_deadline<T, F>(
    deadline: std::time::Duration,
    op: &'static str,
    fut: F,
) -> Result<T, DbError>
where
    F: std::future::Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(res) => res,
        Err(_) => Err(DbError::timeout(op)),
    }
}
