//! Storage gateway
//!
//! Every catalog operation opens its own connection, does its work and
//! closes the connection again before returning, whether it succeeded or
//! not. Nothing is pooled or shared between operations.
//!
//! Multi-statement writes go through [`Gateway::with_transaction`], which
//! commits on success and issues an explicit rollback before surfacing any
//! error, so a failed write never leaves a partial change behind. Reads
//! that need one consistent view use [`Gateway::with_read_transaction`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::config::Config;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::schema::{init_schema, needs_init};

/// How long a connection waits on a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// Rowid of the most recent successful insert on this connection
    pub last_insert_id: i64,
    /// Rows changed by the statement
    pub rows_affected: usize,
}

/// Opens short-lived connections to the catalog database
#[derive(Debug, Clone)]
pub struct Gateway {
    path: PathBuf,
}

impl Gateway {
    /// Gateway for the database file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Gateway for the database configured in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.database_path())
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new connection, creating the file and schema on first use
    pub fn open(&self) -> StoreResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(&self.path).map_err(|source| self.connection_error(source))?;
        self.prepare(&conn)
            .map_err(|source| self.connection_error(source))?;

        debug!("Opened database {:?}", self.path);
        Ok(conn)
    }

    /// Close a connection, reporting any error from the store
    pub fn close(&self, conn: Connection) -> StoreResult<()> {
        conn.close().map_err(|(_, err)| StoreError::Query(err))?;
        debug!("Closed database {:?}", self.path);
        Ok(())
    }

    /// Run `f` with a fresh connection that is closed on every exit path
    pub fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        self.scoped(|conn| f(conn))
    }

    /// Run `f` inside a write transaction on a fresh connection
    ///
    /// The write lock is taken up front. Commits when `f` returns `Ok`;
    /// otherwise rolls back and returns the error from `f`.
    pub fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        self.transaction(TransactionBehavior::Immediate, f)
    }

    /// Run `f` inside a read transaction on a fresh connection
    ///
    /// Gives `f` one consistent view across several queries without
    /// taking the write lock, so it does not wait on an active writer.
    pub fn with_read_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        self.transaction(TransactionBehavior::Deferred, f)
    }

    /// Execute one statement on its own connection
    pub fn run<P: Params>(&self, sql: &str, params: P) -> StoreResult<Execution> {
        self.with_connection(|conn| run(conn, sql, params))
    }

    /// Fetch at most one row on its own connection
    pub fn query_one<T, P, F>(&self, sql: &str, params: P, map: F) -> StoreResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| query_one(conn, sql, params, map))
    }

    /// Fetch every row on its own connection
    pub fn query_all<T, P, F>(&self, sql: &str, params: P, map: F) -> StoreResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| query_all(conn, sql, params, map))
    }

    // ==================== Private helpers ====================

    fn scoped<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.open()?;
        let result = f(&mut conn);

        match (result, self.close(conn)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!("Failed to close database after error: {}", close_err);
                Err(err)
            }
        }
    }

    fn transaction<T, F>(&self, behavior: TransactionBehavior, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        self.scoped(|conn| {
            let tx = conn.transaction_with_behavior(behavior)?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!("Rollback failed after '{}': {}", err, rollback_err);
                    } else {
                        debug!("Rolled back transaction: {}", err);
                    }
                    Err(err)
                }
            }
        })
    }

    fn prepare(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(conn) {
            debug!("Initializing schema in {:?}", self.path);
            init_schema(conn)?;
        }
        Ok(())
    }

    fn connection_error(&self, source: rusqlite::Error) -> StoreError {
        StoreError::Connection {
            path: self.path.clone(),
            source,
        }
    }
}

// ==================== Statement helpers ====================
//
// These work on any open connection, including a `Transaction`, so the
// repositories can compose them inside a caller's transaction.

/// Execute one statement
pub fn run<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Execution> {
    let rows_affected = conn.execute(sql, params)?;
    Ok(Execution {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected,
    })
}

/// Fetch at most one row
pub fn query_one<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> StoreResult<Option<T>>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    Ok(conn.query_row(sql, params, map).optional()?)
}

/// Fetch every row
pub fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> StoreResult<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(rows)
}
