//! A checked-out connection and the read/write primitives built on it.
//!
//! Every queue operation is composed from four calls:
//! - [`QueueConn::write_one`]: one mutating statement, optionally deferred
//! - [`QueueConn::write_batch`]: one statement over many parameter sets, atomically
//! - [`QueueConn::read_many`]: every row of a query
//! - [`QueueConn::read_one`]: the first row of a query, or `None`

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Params, Row};

use super::schema::initialize_schema;
use crate::error::{Result, StoreError};

/// The calling context's private database handle.
///
/// Dropping the handle returns it to the pool. A transaction still open at
/// that point is rolled back first, so the next borrower starts clean.
pub struct QueueConn {
    conn: PooledConnection<SqliteConnectionManager>,
}

impl QueueConn {
    pub(crate) fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { conn }
    }

    /// Borrow the underlying rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the queue schema if it does not exist yet.
    pub fn init_schema(&self) -> Result<()> {
        initialize_schema(&self.conn)
    }

    /// Whether a deferred transaction is open on this handle.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Open a write transaction unless one is already open.
    ///
    /// Takes the write lock immediately, so reads issued afterwards on this
    /// handle see state no other writer can change before the commit.
    pub fn begin(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.exec_control("BEGIN IMMEDIATE")?;
        }
        Ok(())
    }

    /// Commit the open transaction, if any.
    pub fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.exec_control("COMMIT")?;
        }
        Ok(())
    }

    /// Discard the open transaction, if any.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.exec_control("ROLLBACK")?;
        }
        Ok(())
    }

    /// Execute one mutating statement and return the number of affected rows.
    ///
    /// With `commit` set, the statement (and any earlier deferred writes on
    /// this handle) is durable on return. Without it, the write joins an open
    /// transaction, starting one if needed, to be committed later by
    /// [`commit`](Self::commit) or a committing write.
    pub fn write_one<P: Params>(
        &mut self,
        sql: &str,
        params: P,
        commit: bool,
    ) -> Result<usize> {
        if !commit {
            self.begin()?;
        }

        let affected = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params))
            .map_err(|e| StoreError::from_sqlite(sql, e))?;

        if commit {
            self.commit()?;
        }

        tracing::debug!(sql, affected, commit, "write_one");
        Ok(affected)
    }

    /// Execute `sql` once per parameter set as one atomic unit.
    ///
    /// Either every set is applied and committed, or none is. An empty input
    /// touches nothing and returns 0. If a deferred transaction is already
    /// open, the batch joins it and the whole transaction is committed.
    pub fn write_batch<P, I>(&mut self, sql: &str, param_sets: I) -> Result<usize>
    where
        P: Params,
        I: IntoIterator<Item = P>,
    {
        let mut param_sets = param_sets.into_iter().peekable();
        if param_sets.peek().is_none() {
            return Ok(0);
        }

        let opened = self.conn.is_autocommit();
        self.begin()?;

        match self.apply_batch(sql, param_sets) {
            Ok(affected) => {
                self.commit()?;
                tracing::debug!(sql, affected, "write_batch");
                Ok(affected)
            }
            Err(err) => {
                if opened {
                    if let Err(rollback_err) = self.rollback() {
                        tracing::warn!(
                            error = %rollback_err,
                            "Rollback after failed batch failed"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    fn apply_batch<P, I>(&mut self, sql: &str, param_sets: I) -> Result<usize>
    where
        P: Params,
        I: Iterator<Item = P>,
    {
        let map_err = |e: rusqlite::Error| StoreError::from_sqlite(sql, e);

        // A savepoint keeps a failed batch from discarding earlier deferred
        // writes that share the transaction.
        let savepoint = self.conn.savepoint().map_err(map_err)?;
        let mut affected = 0;
        {
            let mut stmt = savepoint.prepare_cached(sql).map_err(map_err)?;
            for params in param_sets {
                affected += stmt.execute(params).map_err(map_err)?;
            }
        }
        savepoint.commit().map_err(map_err)?;
        Ok(affected)
    }

    /// Run a read-only query and map every row, in order.
    pub fn read_many<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let map_err = |e: rusqlite::Error| StoreError::from_sqlite(sql, e);
        let mut stmt = self.conn.prepare_cached(sql).map_err(map_err)?;
        let rows = stmt
            .query_map(params, f)
            .map_err(map_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_err)?;
        Ok(rows)
    }

    /// Run a read-only query and map its first row, if there is one.
    pub fn read_one<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.query_row(params, f).optional())
            .map_err(|e| StoreError::from_sqlite(sql, e))
    }

    fn exec_control(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| StoreError::from_sqlite(sql, e))
    }
}

impl Drop for QueueConn {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            tracing::warn!("Connection returned with an open transaction, rolling back");
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %err, "Failed to roll back abandoned transaction");
            }
        }
    }
}
