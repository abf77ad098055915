// ================================================================
// File: loyalty-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("voucher {0} has expired")]
    VoucherExpired(i64),

    #[error("voucher {0} has no available promo codes")]
    VoucherUnavailable(i64),

    #[error("user '{user_id}' has {balance} points but {required} are required")]
    PointDeficit {
        user_id: String,
        required: f64,
        balance: f64,
    },

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Callers may retry on `Unavailable` and `Timeout`; everything else is
    /// terminal for the request that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Timeout(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}
