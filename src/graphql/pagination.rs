//! Cursor-based pagination types for GraphQL
//!
//! Implements the Relay Connection specification on top of a counted result
//! set. A cursor is the opaque, 1-based ordinal of a row under the exact
//! `(where, order)` that produced it.
//!
//! Usage: compute a [`Window`] with [`Paginator::window`], fetch its rows with
//! `skip`/`take`, then shape them with [`Paginator::connection`]. Use the
//! `define_connection!` macro to expose type-specific GraphQL connections.

use async_graphql::SimpleObject;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graphql::orm::error::{QueryError, QueryResult};

/// Upper bound for `first` / `last`
pub const MAX_PAGE_SIZE: i64 = 200;

/// Information about pagination in a connection
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// When paginating forwards, are there more items?
    pub has_next_page: bool,
    /// When paginating backwards, are there more items?
    pub has_previous_page: bool,
    /// Cursor of the first item in this page
    pub start_cursor: Option<String>,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
}

/// An edge in a connection, containing a node and cursor (internal use)
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The item at the end of the edge
    pub node: T,
    /// A cursor for pagination
    pub cursor: String,
}

/// A paginated connection result (internal use)
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// Rows matching the filter, across all pages
    pub total_count: i64,
    /// Pagination information
    pub page_info: PageInfo,
    /// The edges in this connection
    pub edges: Vec<Edge<T>>,
}

/// Macro to define a GraphQL connection type for a specific entity
///
/// Usage:
/// ```ignore
/// define_connection!(MediaConnection, MediaEdge, Media);
/// ```
#[macro_export]
macro_rules! define_connection {
    ($conn_name:ident, $edge_name:ident, $node_type:ty) => {
        /// Edge containing a node and cursor
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $edge_name {
            /// The item at the end of the edge
            pub node: $node_type,
            /// A cursor for pagination
            pub cursor: String,
        }

        /// Connection containing edges and page info
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $conn_name {
            /// Rows matching the filter, across all pages
            pub total_count: i64,
            /// Pagination information
            pub page_info: $crate::graphql::pagination::PageInfo,
            /// The edges in this connection
            pub edges: Vec<$edge_name>,
        }

        impl $conn_name {
            /// Create from a generic Connection
            pub fn from_connection(
                conn: $crate::graphql::pagination::Connection<$node_type>,
            ) -> Self {
                Self {
                    total_count: conn.total_count,
                    page_info: conn.page_info,
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge_name {
                            node: e.node,
                            cursor: e.cursor,
                        })
                        .collect(),
                }
            }
        }
    };
}

// ============================================================================
// Cursor codec
// ============================================================================

/// Encode a 1-based ordinal as a cursor string
pub fn encode_cursor(ordinal: i64) -> String {
    BASE64.encode(format!("cursor:{}", ordinal))
}

/// Decode a cursor string to its ordinal
pub fn decode_cursor(cursor: &str) -> QueryResult<i64> {
    let decoded = BASE64
        .decode(cursor)
        .map_err(|_| QueryError::InvalidCursor("invalid cursor format".into()))?;

    let s = String::from_utf8(decoded)
        .map_err(|_| QueryError::InvalidCursor("invalid cursor encoding".into()))?;

    let Some(value) = s.strip_prefix("cursor:") else {
        return Err(QueryError::InvalidCursor("invalid cursor prefix".into()));
    };

    value
        .parse()
        .map_err(|_| QueryError::InvalidCursor("invalid cursor value".into()))
}

/// Decode a cursor and require it to address a row of a `total_count`-row result
pub fn decode_cursor_in_range(cursor: &str, total_count: i64) -> QueryResult<i64> {
    let ordinal = decode_cursor(cursor)?;
    if ordinal <= 0 || ordinal > total_count {
        return Err(QueryError::CursorRange {
            ordinal,
            total_count,
        });
    }
    Ok(ordinal)
}

// ============================================================================
// Arguments
// ============================================================================

/// Relay pagination arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
}

impl PaginationArgs {
    pub fn first(first: i64) -> Self {
        Self {
            first: Some(first),
            ..Self::default()
        }
    }

    pub fn last(last: i64) -> Self {
        Self {
            last: Some(last),
            ..Self::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    /// Checks that need no row count: page sizes, exclusivity, cursor syntax
    pub fn validate(&self, max_page_size: i64) -> QueryResult<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(QueryError::InvalidPagination(
                "`first` and `last` cannot be used together".into(),
            ));
        }
        for (name, value) in [("first", self.first), ("last", self.last)] {
            if let Some(n) = value {
                if !(1..=max_page_size).contains(&n) {
                    return Err(QueryError::InvalidPagination(format!(
                        "`{}` must be between 1 and {}, got {}",
                        name, max_page_size, n
                    )));
                }
            }
        }
        for cursor in [&self.after, &self.before].into_iter().flatten() {
            decode_cursor(cursor)?;
        }
        Ok(())
    }
}

// ============================================================================
// Window
// ============================================================================

/// Inclusive 1-based range of ordinals on the current page.
///
/// An empty window has `end == start - 1`, so
/// `count_before + len + count_after == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start - 1),
        }
    }

    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows to skip before the window
    pub fn skip(&self) -> i64 {
        self.start - 1
    }

    /// Rows to fetch
    pub fn take(&self) -> i64 {
        self.len()
    }

    pub fn count_before(&self) -> i64 {
        self.start - 1
    }

    pub fn count_after(&self, total_count: i64) -> i64 {
        total_count - self.end
    }
}

// ============================================================================
// Paginator
// ============================================================================

/// Turns pagination arguments and a row count into a window and page info
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    max_page_size: i64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl Paginator {
    /// `max_page_size` is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(max_page_size: i64) -> Self {
        Self {
            max_page_size: max_page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn max_page_size(&self) -> i64 {
        self.max_page_size
    }

    /// Window addressed by `args` over a `total_count`-row result.
    ///
    /// - `first` (optionally `after`): the `first` rows following `after`
    /// - `last` (optionally `before`): the `last` rows preceding `before`,
    ///   or the tail of the result when `before` is absent
    /// - `after` alone reads like `first = max`, `before` alone like `last = max`
    /// - no arguments: the first `max` rows
    ///
    /// `after >= total_count` yields an empty window at the end of the result,
    /// `before == 1` an empty window at its start. A `before` past the last
    /// row reads like `last` alone. Only ordinals below 1 are out of range.
    pub fn window(&self, args: &PaginationArgs, total_count: i64) -> QueryResult<Window> {
        args.validate(self.max_page_size)?;

        let after = args.after.as_deref().map(decode_cursor).transpose()?;
        let before = args.before.as_deref().map(decode_cursor).transpose()?;
        for ordinal in [after, before].into_iter().flatten() {
            if ordinal <= 0 {
                return Err(QueryError::CursorRange {
                    ordinal,
                    total_count,
                });
            }
        }

        if after.is_some_and(|a| a >= total_count) {
            return Ok(self.log_window(Window::new(total_count + 1, total_count), total_count));
        }
        if before == Some(1) {
            return Ok(self.log_window(Window::new(1, 0), total_count));
        }

        let mut lo = after.map_or(1, |a| a + 1);
        let mut hi = before.map_or(total_count, |b| b.min(total_count + 1) - 1);

        let (first, last) = match (args.first, args.last) {
            (None, None) if before.is_some() && after.is_none() => (None, Some(self.max_page_size)),
            (None, None) => (Some(self.max_page_size), None),
            other => other,
        };

        if let Some(first) = first {
            hi = hi.min(lo + first - 1);
        }
        if let Some(last) = last {
            lo = lo.max(hi - last + 1).max(1);
        }

        Ok(self.log_window(Window::new(lo, hi), total_count))
    }

    fn log_window(&self, window: Window, total_count: i64) -> Window {
        debug!(
            total_count,
            start = window.start,
            end = window.end,
            "Computed pagination window"
        );
        window
    }

    /// Page info for `window`
    pub fn page_info(&self, window: Window, total_count: i64) -> PageInfo {
        let (start_cursor, end_cursor) = if window.is_empty() {
            (None, None)
        } else {
            (Some(encode_cursor(window.start)), Some(encode_cursor(window.end)))
        };

        PageInfo {
            has_next_page: window.end < total_count,
            has_previous_page: window.start > 1,
            start_cursor,
            end_cursor,
        }
    }

    /// Shape fetched rows into a connection.
    ///
    /// If fewer rows came back than the window asked for, the window is
    /// narrowed to what was actually returned.
    pub fn connection<T>(&self, window: Window, total_count: i64, nodes: Vec<T>) -> Connection<T> {
        let fetched = Window::new(window.start, window.start + nodes.len() as i64 - 1);
        let edges = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: encode_cursor(fetched.start + i as i64),
                node,
            })
            .collect();

        Connection {
            total_count,
            page_info: self.page_info(fetched, total_count),
            edges,
        }
    }
}
