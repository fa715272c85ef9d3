//! Librarian query engine
//!
//! Compiles GraphQL-style list arguments (`where`, `order`, `first`/`after`,
//! `last`/`before`) into relation-aware SQL reads and Relay connections.
//!
//! ```rust,ignore
//! use librarian_query::graphql::orm::{EntityQueryArgs, QueryService};
//!
//! let service = QueryService::<Media, _>::sqlite(&db, registry, catalog, &config);
//! let args: EntityQueryArgs = serde_json::from_value(json!({
//!     "first": 10,
//!     "where": { "title": { "iLike": "%dune%" } },
//!     "order": { "releaseDate": { "direction": "DESC" } }
//! }))?;
//! let connection = service.connection(&args).await?;
//! ```

pub mod config;
pub mod db;
pub mod graphql;
pub mod logging;

pub use config::QueryConfig;
pub use db::Database;
