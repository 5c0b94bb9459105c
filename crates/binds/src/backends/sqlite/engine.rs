//! SQLite engine implementation.

use std::fmt::Debug;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use uuid::Uuid;

use crate::config::EngineOptions;
use crate::error::{BindResult, ConnectionError};
use crate::model::Table;
use crate::url::{DatabaseUrl, SqliteLocation};

use super::schema;

/// A pooled database engine for one connection string.
pub struct Engine {
    id: Uuid,
    url: DatabaseUrl,
    pool: Pool<SqliteConnectionManager>,
    options: EngineOptions,
}

impl Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("is_memory", &self.is_memory())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates a private in-memory engine with default options.
    pub fn in_memory() -> BindResult<Self> {
        Self::connect("sqlite://", &EngineOptions::default())
    }

    /// Parses a connection string and creates an engine for it.
    pub fn connect(url: &str, options: &EngineOptions) -> BindResult<Self> {
        Self::new(DatabaseUrl::parse(url)?, options)
    }

    /// Creates an engine for a parsed URL.
    ///
    /// No connection is opened here.
    pub fn new(url: DatabaseUrl, options: &EngineOptions) -> BindResult<Self> {
        options.validate()?;
        let busy_timeout = url.busy_timeout_override()?.unwrap_or(options.busy_timeout);
        let read_only = url.is_read_only();
        let is_memory = url.is_memory();
        let enable_foreign_keys = options.enable_foreign_keys;
        let enable_wal = options.enable_wal && !is_memory && !read_only;

        let manager = match url.location() {
            SqliteLocation::Memory => SqliteConnectionManager::memory(),
            SqliteLocation::File(path) => SqliteConnectionManager::file(path),
        };
        let manager = if read_only {
            manager.with_flags(
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        } else {
            manager
        };
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if enable_foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON")?;
            }
            if enable_wal {
                // journal_mode answers with the mode now in effect.
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
            }
            Ok(())
        });

        let builder = Pool::builder()
            .min_idle(Some(0))
            .connection_timeout(options.connection_timeout);
        let builder = if is_memory {
            // One connection, never reaped, so the database outlives every checkout.
            builder.max_size(1).idle_timeout(None).max_lifetime(None)
        } else {
            builder.max_size(options.max_connections)
        };
        let pool = builder.build_unchecked(manager);

        let engine = Self {
            id: Uuid::new_v4(),
            url,
            pool,
            options: options.clone(),
        };
        tracing::debug!(engine_id = %engine.id, url = %engine.url, "Created engine");
        Ok(engine)
    }

    /// Returns the unique id of this engine.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the URL this engine was created for.
    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.url.is_memory()
    }

    /// Returns the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns `true` if both handles point to the same engine.
    pub fn same(a: &Arc<Engine>, b: &Arc<Engine>) -> bool {
        Arc::ptr_eq(a, b)
    }

    /// Checks a connection out of the pool.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, ConnectionError> {
        self.pool.get().map_err(|e| ConnectionError::ConnectionFailed {
            url: self.url.to_string(),
            message: e.to_string(),
        })
    }

    /// Executes one or more SQL statements.
    pub fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        let conn = self.connection()?;
        conn.execute_batch(sql)
            .map_err(|e| self.statement_error("Failed to execute batch", e))
    }

    /// Lists the user tables present in the database.
    pub fn table_names(&self) -> Result<Vec<String>, ConnectionError> {
        let conn = self.connection()?;
        schema::table_names(&conn).map_err(|e| self.statement_error("Failed to reflect tables", e))
    }

    /// Returns `true` if the table exists in the database.
    pub fn has_table(&self, name: &str) -> Result<bool, ConnectionError> {
        let conn = self.connection()?;
        schema::has_table(&conn, name)
            .map_err(|e| self.statement_error("Failed to look up table", e))
    }

    /// Creates the given tables if they do not exist.
    pub fn create_tables(&self, tables: &[&Table]) -> Result<(), ConnectionError> {
        if tables.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection()?;
        schema::create_tables(&mut conn, tables)
            .map_err(|e| self.statement_error("Failed to create tables", e))
    }

    /// Drops the given tables if they exist.
    pub fn drop_tables(&self, tables: &[&Table]) -> Result<(), ConnectionError> {
        if tables.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection()?;
        schema::drop_tables(&mut conn, tables)
            .map_err(|e| self.statement_error("Failed to drop tables", e))
    }

    /// Runs a trivial query to verify the engine can serve connections.
    pub fn health_check(&self) -> Result<(), ConnectionError> {
        let conn = self.connection().map_err(|e| ConnectionError::Unavailable {
            url: self.url.to_string(),
            message: e.to_string(),
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| ConnectionError::Unavailable {
                url: self.url.to_string(),
                message: format!("Health check failed: {}", e),
            })
    }

    fn statement_error(&self, context: &str, e: rusqlite::Error) -> ConnectionError {
        ConnectionError::Statement {
            url: self.url.to_string(),
            message: format!("{}: {}", context, e),
            source: Some(e),
        }
    }
}
