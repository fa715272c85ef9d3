//! Query compilation layer
//!
//! Compiles caller-supplied filter trees, sort specs and Relay pagination
//! arguments into one relation-aware read per request:
//! - Field metadata per record type (`FieldRegistry`)
//! - Single-field comparisons (`ComparisonCompiler`)
//! - Join discovery (`RelationResolver`)
//! - Filter and sort compilation (`WhereBuilder`, `SortBuilder`)
//! - The SQLite store adapter (`EntityQuery`)
//! - Orchestration and connection shaping (`QueryService`)
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::graphql::filters::{FieldComparison, FilterNode};
//!
//! let args = EntityQueryArgs::new()
//!     .first(10)
//!     .filter(FilterNode::new().field("title", FieldComparison::ilike("%dune%")));
//!
//! let page = media_service.connection(&args).await?;
//! ```

pub mod builder;
pub mod comparison;
pub mod error;
pub mod predicate;
pub mod registry;
pub mod relations;
pub mod remap;
pub mod service;
pub mod sort_builder;
pub mod traits;
pub mod where_builder;

pub use builder::{EntityQuery, SqliteStore};
pub use comparison::ComparisonCompiler;
pub use error::{QueryError, QueryResult};
pub use predicate::Predicate;
pub use registry::{FieldDescriptor, FieldKind, FieldRegistry};
pub use relations::{EntityCatalog, EntityDef, MetadataProvider, Relation, RelationMap, RelationResolver};
pub use remap::{path_map, remap_filter, remap_sort};
pub use service::{EntityQueryArgs, QueryService};
pub use sort_builder::{OrderTerm, SortBuilder};
pub use traits::*;
pub use where_builder::WhereBuilder;

// Re-export input and output types used alongside the service
pub use super::filters::{FieldComparison, FieldCondition, FilterNode, Operand, Operator};
pub use super::pagination::{Connection, Edge, PageInfo, PaginationArgs, Paginator, decode_cursor, encode_cursor};
pub use super::sorting::{SortDirection, SortField, SortNulls, SortSpec};
