use crate::models::FollowUpStatus;
use std::fmt;

/// Error kinds surfaced by the lead lifecycle core.
///
/// Every error is local and synchronous. The core never retries; callers that
/// want a retry loop should consult [`AppError::is_transient`].
#[derive(Debug)]
pub enum AppError {
    /// Store-level failure (connection, I/O, constraint, decode).
    DatabaseError(sqlx::Error),
    /// The operation referenced an id that does not exist.
    NotFound(String),
    /// Insert collided with an existing record holding different data.
    DuplicateKey(String),
    /// Missing or malformed input field.
    Validation(String),
    /// Follow-up scheduled in the past without the backdating override.
    InvalidSchedule(String),
    /// Follow-up state machine violation.
    InvalidTransition {
        id: i64,
        from: FollowUpStatus,
        to: FollowUpStatus,
    },
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Whether the failure comes from store availability rather than from the
    /// request itself. Only these are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::DatabaseError(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db) => {
                    // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
                    db.code()
                        .and_then(|c| c.parse::<i32>().ok())
                        .map(|c| matches!(c & 0xff, 5 | 6))
                        .unwrap_or(false)
                }
                _ => false,
            },
            AppError::WithContext { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::DuplicateKey(msg) => write!(f, "Duplicate key: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::InvalidSchedule(msg) => write!(f, "Invalid schedule: {}", msg),
            AppError::InvalidTransition { id, from, to } => write!(
                f,
                "Invalid transition for follow-up {}: {} -> {}",
                id,
                from.as_str(),
                to.as_str()
            ),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DatabaseError(e) => Some(e),
            AppError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(sqlx::Error::Migrate(Box::new(err)))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_and_displays_chain() {
        let err: Result<(), AppError> = Err(AppError::NotFound("lead lead_42".to_string()));
        let wrapped = err.context("scoring lead").unwrap_err();

        assert_eq!(wrapped.to_string(), "scoring lead: Not found: lead lead_42");
        assert!(matches!(wrapped.root(), AppError::NotFound(_)));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());

        let wrapped: Result<(), sqlx::Error> = Err(sqlx::Error::PoolClosed);
        assert!(wrapped.context("recording metric").unwrap_err().is_transient());
    }

    #[test]
    fn test_domain_errors_are_not_transient() {
        assert!(!AppError::Validation("company_name is required".into()).is_transient());
        assert!(!AppError::InvalidTransition {
            id: 1,
            from: FollowUpStatus::Cancelled,
            to: FollowUpStatus::Sent,
        }
        .is_transient());
        assert!(!AppError::from(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::InvalidTransition {
            id: 7,
            from: FollowUpStatus::Sent,
            to: FollowUpStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition for follow-up 7: sent -> cancelled"
        );
    }
}
