//! GraphQL-facing query inputs and outputs
//!
//! - `filters`: the `where` tree (`FilterNode`, `FieldComparison`, operators)
//! - `sorting`: the `order` spec (`SortSpec`, `SortDirection`, `SortNulls`)
//! - `pagination`: cursors, windows and Relay connections
//! - `orm`: the compiler that turns all of the above into SQL

pub mod filters;
pub mod orm;
pub mod pagination;
pub mod sorting;
