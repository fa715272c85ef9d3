//! Core traits for the query layer
//!
//! Entities describe their table with [`DatabaseEntity`] and decode rows with
//! [`FromSqlRow`]. Stores implement [`EntityStore`] / [`StoreQuery`], which is
//! the only surface the compiler talks to.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use super::error::QueryResult;
use super::predicate::Predicate;
use crate::graphql::sorting::{SortDirection, SortNulls};

/// Metadata about a database entity (table).
pub trait DatabaseEntity: Sized + Send + Sync {
    /// Type name used by the field registry and entity catalog (e.g., "Media")
    const TYPE_NAME: &'static str;

    /// The SQL table name (e.g., "media")
    const TABLE_NAME: &'static str;

    /// The primary key column name (e.g., "id")
    const PRIMARY_KEY: &'static str;
}

/// Trait for decoding a database row into an entity.
pub trait FromSqlRow: Sized {
    /// Decode a SQLite row into this entity type
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Represents a SQL value that can be bound to a query.
///
/// Used by filters to collect values for parameterized queries.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl SqlValue {
    /// Bind this value to a sqlx query builder
    pub fn bind_to_query<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        }
    }

    /// Bind this value to a scalar (COUNT) query
    pub fn bind_to_scalar<'q, O>(
        &'q self,
        query: sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Bool(b) => query.bind(if *b { 1i32 } else { 0i32 }),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

/// The store query-builder contract consumed by [`QueryService`](super::QueryService).
///
/// Mutating methods only record intent; nothing reaches the store until
/// [`get_many`](StoreQuery::get_many) or [`get_count`](StoreQuery::get_count).
#[async_trait]
pub trait StoreQuery<E>: Send + Sync {
    /// Alias of the root entity in this query
    fn alias(&self) -> &str;

    /// Graft `LEFT JOIN` for `path` (`"<parent alias>.<relation>"`) under `alias`
    fn left_join(&mut self, path: &str, alias: &str) -> QueryResult<()>;

    fn and_where(&mut self, predicate: Predicate);

    fn or_where(&mut self, predicate: Predicate);

    fn add_order_by(&mut self, column: &str, direction: SortDirection, nulls: Option<SortNulls>);

    fn skip(&mut self, n: i64);

    fn take(&mut self, n: i64);

    /// Fetch the (distinct) root rows
    async fn get_many(&self) -> QueryResult<Vec<E>>;

    /// Count the (distinct) root rows, ignoring ordering and skip/take
    async fn get_count(&self) -> QueryResult<i64>;
}

/// Factory for fresh store queries against one entity type.
pub trait EntityStore<E>: Send + Sync {
    type Query: StoreQuery<E>;

    fn create_query(&self) -> Self::Query;
}
