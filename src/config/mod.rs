//! Query engine configuration

use std::env;

use anyhow::{Context, Result};

use crate::graphql::pagination::MAX_PAGE_SIZE;

/// Configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// SQLite URL (`sqlite:...`) or bare database file path
    pub database_url: String,

    /// Pool size. Always 1 for in-memory databases, which exist per connection.
    pub max_connections: u32,

    /// Default and maximum page size for connections
    pub max_page_size: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl QueryConfig {
    /// Load configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let database_url = lookup("DATABASE_PATH")
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| "sqlite::memory:".to_string());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse::<u32>()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
            None => 5,
        };
        let max_connections = if is_memory_url(&database_url) {
            1
        } else {
            max_connections.max(1)
        };

        let max_page_size = match lookup("QUERY_MAX_PAGE_SIZE") {
            Some(value) => value
                .parse::<i64>()
                .context("Invalid QUERY_MAX_PAGE_SIZE")?,
            None => MAX_PAGE_SIZE,
        };

        Ok(Self {
            database_url,
            max_connections,
            max_page_size: max_page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }
}

pub(crate) fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
