//! Error taxonomy for query compilation and execution

use thiserror::Error;

/// Everything that can go wrong while compiling or running an entity query.
///
/// All variants except [`QueryError::Store`] are caller-input errors. They are
/// raised before the page is fetched and are never retried.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The type has no filterable/sortable fields registered.
    #[error("no filterable fields registered for type `{0}`")]
    Schema(String),

    /// Operator is not legal for the field kind, or excluded by the allow-list.
    #[error("operator `{operator}` is not supported on field `{field}`")]
    UnsupportedOperator { field: String, operator: String },

    /// Malformed operand or filter shape.
    #[error("invalid filter on `{field}`: {reason}")]
    InvalidFilter { field: String, reason: String },

    /// Cursor could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Cursor decoded, but the ordinal is outside the current result set.
    #[error("cursor position {ordinal} is outside 1..={total_count}")]
    CursorRange { ordinal: i64, total_count: i64 },

    /// `first`/`last` out of range or used together.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    /// Store failure, surfaced unchanged.
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl QueryError {
    pub fn invalid_filter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_operator(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            field: field.into(),
            operator: operator.into(),
        }
    }

    /// True for errors caused by the request rather than the store.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
