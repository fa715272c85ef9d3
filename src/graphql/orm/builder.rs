//! SQL Query Builder for the query layer
//!
//! [`EntityQuery`] is the SQLite implementation of [`StoreQuery`]. It records
//! joins, predicates, ordering and paging, renders them into one
//! parameterized statement, and runs it through sqlx.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::error::{QueryError, QueryResult};
use super::predicate::Predicate;
use super::relations::MetadataProvider;
use super::traits::{DatabaseEntity, EntityStore, FromSqlRow, SqlValue, StoreQuery};
use crate::graphql::sorting::{SortDirection, SortNulls};

/// A query builder for database entities.
///
/// The root table is aliased by its own name. Joined relations are aliased
/// by the caller, and every join is a `LEFT JOIN`. When anything is joined
/// the rows are grouped by the root primary key, so each root row appears
/// at most once in both the page and the count.
pub struct EntityQuery<E: DatabaseEntity> {
    pool: SqlitePool,
    metadata: Arc<dyn MetadataProvider>,
    alias: String,
    /// alias -> record type, for resolving join paths
    alias_types: HashMap<String, String>,
    /// alias -> join path it was grafted from
    join_paths: HashMap<String, String>,
    joins: Vec<String>,
    where_clause: Option<Predicate>,
    order_clauses: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: DatabaseEntity + FromSqlRow> EntityQuery<E> {
    /// Create a new query builder for the entity type.
    pub fn new(pool: SqlitePool, metadata: Arc<dyn MetadataProvider>) -> Self {
        let mut alias_types = HashMap::new();
        alias_types.insert(E::TABLE_NAME.to_string(), E::TYPE_NAME.to_string());
        Self {
            pool,
            metadata,
            alias: E::TABLE_NAME.to_string(),
            alias_types,
            join_paths: HashMap::new(),
            joins: Vec::new(),
            where_clause: None,
            order_clauses: Vec::new(),
            limit: None,
            offset: None,
            _phantom: PhantomData,
        }
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM \"{}\" AS \"{}\"", E::TABLE_NAME, self.alias);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql
    }

    fn push_where(&self, sql: &mut String, values: &mut Vec<SqlValue>) {
        if let Some(ref predicate) = self.where_clause {
            if !predicate.is_always() {
                sql.push_str(" WHERE ");
                predicate.render(sql, values);
            }
        }
    }

    /// Build the SELECT statement and its bind values.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut values = Vec::new();
        let mut sql = format!("SELECT \"{}\".* {}", self.alias, self.from_clause());

        self.push_where(&mut sql, &mut values);

        if !self.joins.is_empty() {
            sql.push_str(&format!(" GROUP BY \"{}\".\"{}\"", self.alias, E::PRIMARY_KEY));
        }

        if !self.order_clauses.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clauses.join(", "));
        }

        match (self.limit, self.offset.filter(|&o| o > 0)) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" LIMIT {}", limit));
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {}", offset));
                }
            }
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, values)
    }

    /// Build the COUNT statement and its bind values.
    ///
    /// Ordering and paging are ignored.
    pub fn to_count_sql(&self) -> (String, Vec<SqlValue>) {
        let mut values = Vec::new();
        let mut sql = format!(
            "SELECT COUNT(DISTINCT \"{}\".\"{}\") {}",
            self.alias,
            E::PRIMARY_KEY,
            self.from_clause()
        );
        self.push_where(&mut sql, &mut values);
        (sql, values)
    }
}

#[async_trait]
impl<E: DatabaseEntity + FromSqlRow> StoreQuery<E> for EntityQuery<E> {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn left_join(&mut self, path: &str, alias: &str) -> QueryResult<()> {
        match self.join_paths.get(alias) {
            Some(joined) if joined == path => return Ok(()),
            Some(joined) => {
                return Err(QueryError::invalid_filter(
                    path,
                    format!("alias `{}` is already joined as `{}`", alias, joined),
                ));
            }
            None if self.alias_types.contains_key(alias) => {
                return Err(QueryError::invalid_filter(path, format!("alias `{}` is taken by the root", alias)));
            }
            None => {}
        }

        let (parent_alias, property) = path
            .rsplit_once('.')
            .ok_or_else(|| QueryError::invalid_filter(path, "join path must be `<alias>.<relation>`"))?;
        let parent_type = self
            .alias_types
            .get(parent_alias)
            .ok_or_else(|| QueryError::invalid_filter(path, format!("unknown alias `{}`", parent_alias)))?;
        let relation = self
            .metadata
            .relation(parent_type, property)
            .ok_or_else(|| {
                QueryError::invalid_filter(path, format!("`{}` has no relation `{}`", parent_type, property))
            })?;
        let table = self
            .metadata
            .table_of(&relation.related_type)
            .ok_or_else(|| QueryError::Schema(relation.related_type.clone()))?;

        tracing::debug!(path, alias, table, "Grafting left join");

        self.joins.push(format!(
            "LEFT JOIN \"{table}\" AS \"{alias}\" ON \"{alias}\".\"{}\" = \"{parent_alias}\".\"{}\"",
            relation.foreign_column, relation.local_column
        ));
        let related_type = relation.related_type.clone();
        self.alias_types.insert(alias.to_string(), related_type);
        self.join_paths.insert(alias.to_string(), path.to_string());
        Ok(())
    }

    fn and_where(&mut self, predicate: Predicate) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Predicate::all(vec![existing, predicate]),
            None => predicate,
        });
    }

    fn or_where(&mut self, predicate: Predicate) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Predicate::any(vec![existing, predicate]),
            None => predicate,
        });
    }

    fn add_order_by(&mut self, column: &str, direction: SortDirection, nulls: Option<SortNulls>) {
        let mut clause = format!("{} {}", column, direction.to_sql());
        if let Some(nulls) = nulls {
            clause.push(' ');
            clause.push_str(nulls.to_sql());
        }
        self.order_clauses.push(clause);
    }

    fn skip(&mut self, n: i64) {
        self.offset = Some(n);
    }

    fn take(&mut self, n: i64) {
        self.limit = Some(n);
    }

    async fn get_many(&self) -> QueryResult<Vec<E>> {
        let (sql, values) = self.to_sql();
        tracing::debug!(sql = %sql, "Executing entity query");

        let mut query = sqlx::query(&sql);
        for value in &values {
            query = value.bind_to_query(query);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let entities = rows.iter().map(E::from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    async fn get_count(&self) -> QueryResult<i64> {
        let (sql, values) = self.to_count_sql();
        tracing::debug!(sql = %sql, "Executing count query");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in &values {
            query = value.bind_to_scalar(query);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }
}

/// [`EntityStore`] backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    metadata: Arc<dyn MetadataProvider>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { pool, metadata }
    }
}

impl<E: DatabaseEntity + FromSqlRow> EntityStore<E> for SqliteStore {
    type Query = EntityQuery<E>;

    fn create_query(&self) -> EntityQuery<E> {
        EntityQuery::new(self.pool.clone(), Arc::clone(&self.metadata))
    }
}
