//! Database connection

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::config::{QueryConfig, is_memory_url};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new database connection pool
    ///
    /// A bare file path is opened as `sqlite:<path>`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{}", url)
        };
        let max_connections = if is_memory_url(&url) { 1 } else { max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        tracing::debug!(url = %url, max_connections, "Database connected");
        Ok(Self { pool })
    }

    /// Connect using the configured URL and pool size
    pub async fn from_config(config: &QueryConfig) -> Result<Self> {
        Self::connect(&config.database_url, config.max_connections).await
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
