//! Query orchestration
//!
//! [`QueryService`] ties the pieces together for one record type:
//!
//! 1. resolve the relations referenced by `where` and `order`
//! 2. graft one `LEFT JOIN` per relation onto a fresh store query
//! 3. apply the compiled filter and ordering (primary key last, for stable ordinals)
//! 4. count, compute the window, fetch it, and shape the connection
//!
//! Everything that can be rejected without the row count is rejected before
//! the first store round-trip.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::builder::SqliteStore;
use super::comparison::qualify;
use super::error::{QueryError, QueryResult};
use super::registry::FieldRegistry;
use super::relations::{MetadataProvider, RelationMap, RelationResolver, join_alias};
use super::sort_builder::{OrderTerm, SortBuilder};
use super::traits::{DatabaseEntity, EntityStore, FromSqlRow, StoreQuery};
use super::where_builder::WhereBuilder;
use crate::config::QueryConfig;
use crate::db::Database;
use crate::graphql::filters::FilterNode;
use crate::graphql::pagination::{Connection, PaginationArgs, Paginator};
use crate::graphql::sorting::{SortDirection, SortSpec};

/// Arguments of a connection query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityQueryArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
    #[serde(rename = "where")]
    pub filter: Option<FilterNode>,
    pub order: Option<SortSpec>,
}

impl EntityQueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn last(mut self, last: i64) -> Self {
        self.last = Some(last);
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order(mut self, order: SortSpec) -> Self {
        self.order = Some(order);
        self
    }

    pub fn pagination(&self) -> PaginationArgs {
        PaginationArgs {
            first: self.first,
            after: self.after.clone(),
            last: self.last,
            before: self.before.clone(),
        }
    }
}

/// Filter, sort and paginate one record type against a store
pub struct QueryService<E, S> {
    store: S,
    registry: Arc<FieldRegistry>,
    metadata: Arc<dyn MetadataProvider>,
    paginator: Paginator,
    _phantom: PhantomData<fn() -> E>,
}

impl<E: DatabaseEntity + FromSqlRow> QueryService<E, SqliteStore> {
    /// Service backed by a SQLite database
    pub fn sqlite(
        db: &Database,
        registry: Arc<FieldRegistry>,
        metadata: Arc<dyn MetadataProvider>,
        config: &QueryConfig,
    ) -> Self {
        let store = SqliteStore::new(db.pool().clone(), Arc::clone(&metadata));
        Self::new(store, registry, metadata, Paginator::new(config.max_page_size))
    }
}

impl<E, S> QueryService<E, S>
where
    E: DatabaseEntity,
    S: EntityStore<E>,
{
    pub fn new(
        store: S,
        registry: Arc<FieldRegistry>,
        metadata: Arc<dyn MetadataProvider>,
        paginator: Paginator,
    ) -> Self {
        Self {
            store,
            registry,
            metadata,
            paginator,
            _phantom: PhantomData,
        }
    }

    /// Whether `filter` reaches into any relation
    pub fn has_relations(&self, filter: &FilterNode) -> bool {
        !RelationResolver::new(self.metadata.as_ref())
            .resolve_filter(E::TYPE_NAME, filter)
            .is_empty()
    }

    /// A store query with joins, filter and ordering applied, but no paging
    pub fn prepare(&self, filter: Option<&FilterNode>, order: Option<&SortSpec>) -> QueryResult<S::Query> {
        let metadata = self.metadata.as_ref();
        let mut query = self.store.create_query();
        let alias = query.alias().to_string();

        let relations = RelationResolver::new(metadata).resolve_all(E::TYPE_NAME, filter, order);

        // A missing `where` still has to satisfy required fields
        let unfiltered = FilterNode::new();
        let predicate = WhereBuilder::new(&self.registry, metadata).build(
            E::TYPE_NAME,
            filter.unwrap_or(&unfiltered),
            &relations,
            Some(&alias),
        )?;
        let mut terms = match order {
            Some(order) => SortBuilder::new(&self.registry, metadata).build(
                E::TYPE_NAME,
                order,
                &relations,
                Some(&alias),
            )?,
            None => Vec::new(),
        };

        let primary_key = qualify(Some(&alias), E::PRIMARY_KEY);
        if !terms.iter().any(|t| t.column == primary_key) {
            terms.push(OrderTerm {
                column: primary_key,
                direction: SortDirection::Asc,
                nulls: None,
            });
        }

        if !relations.is_empty() {
            debug!(type_name = E::TYPE_NAME, joins = relations.join_count(), "Grafting relations");
        }
        graft::<E, _>(&mut query, &relations, &alias, None)?;
        if !predicate.is_always() {
            query.and_where(predicate);
        }
        for term in &terms {
            query.add_order_by(&term.column, term.direction, term.nulls);
        }

        Ok(query)
    }

    /// Number of rows matching `filter`
    pub async fn count(&self, filter: Option<&FilterNode>) -> QueryResult<i64> {
        let query = self.prepare(filter, None).inspect_err(log_rejection)?;
        query.get_count().await
    }

    /// Every matching row, filtered and sorted but not windowed
    pub async fn find_all(&self, args: &EntityQueryArgs) -> QueryResult<Vec<E>> {
        let query = self
            .prepare(args.filter.as_ref(), args.order.as_ref())
            .inspect_err(log_rejection)?;
        query.get_many().await
    }

    /// One page of matching rows as a Relay connection
    pub async fn connection(&self, args: &EntityQueryArgs) -> QueryResult<Connection<E>> {
        let pagination = args.pagination();
        pagination
            .validate(self.paginator.max_page_size())
            .inspect_err(log_rejection)?;

        let mut query = self
            .prepare(args.filter.as_ref(), args.order.as_ref())
            .inspect_err(log_rejection)?;

        let total_count = query.get_count().await?;
        let window = self
            .paginator
            .window(&pagination, total_count)
            .inspect_err(log_rejection)?;

        let nodes = if window.is_empty() {
            Vec::new()
        } else {
            query.skip(window.skip());
            query.take(window.take());
            query.get_many().await?
        };

        let connection = self.paginator.connection(window, total_count, nodes);
        debug!(
            type_name = E::TYPE_NAME,
            total_count,
            edges = connection.edges.len(),
            has_next_page = connection.page_info.has_next_page,
            has_previous_page = connection.page_info.has_previous_page,
            "Built connection"
        );
        Ok(connection)
    }
}

/// Join every relation in `relations` under `parent_alias`, depth first
fn graft<E, Q: StoreQuery<E>>(
    query: &mut Q,
    relations: &RelationMap,
    parent_alias: &str,
    join_prefix: Option<&str>,
) -> QueryResult<()> {
    for (name, children) in relations.iter() {
        let alias = join_alias(join_prefix, name);
        query.left_join(&format!("{}.{}", parent_alias, name), &alias)?;
        graft::<E, Q>(query, children, &alias, Some(&alias))?;
    }
    Ok(())
}

fn log_rejection(err: &QueryError) {
    if err.is_caller_error() {
        warn!(error = %err, "Rejected query arguments");
    }
}
