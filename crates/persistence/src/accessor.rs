// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The table-bound CRUD wrapper.
//!
//! An [`EntityAccessor`] is created once per table and kept for the life of
//! the process. It owns its connection; every verb takes `&mut self`, so one
//! accessor can never be driven by two logical operations at once without
//! the caller choosing a synchronization strategy. Queries are passed by
//! value and consumed by the verb.

use tracing::debug;

use crate::connection::ConnectionManager;
use crate::data_models::IdRow;
use crate::database::Database;
use crate::error::PersistenceError;
use crate::executor::RowShape;
use crate::query::{Condition, Query, Statement};
use crate::value::Record;

#[derive(Debug)]
pub struct EntityAccessor {
    table: &'static str,
    connection: ConnectionManager,
}

impl EntityAccessor {
    /// Binds an accessor to `table`. The table cannot change afterward.
    #[must_use]
    pub fn new(database: &Database, table: &'static str) -> Self {
        debug!(table, "Creating entity accessor");
        Self {
            table,
            connection: ConnectionManager::new(database.connector()),
        }
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Drops the accessor's connection. The next verb reconnects.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// Runs `query` as a `SELECT` and returns every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails, after at most one reconnect.
    pub fn get<T: RowShape>(&mut self, query: Query) -> Result<Vec<T>, PersistenceError> {
        let statement: Statement = query.into_select(self.table);
        self.connection.run(|conn| conn.load::<T>(&statement))
    }

    /// Returns the first row of `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn first<T: RowShape>(&mut self, query: Query) -> Result<Option<T>, PersistenceError> {
        Ok(self.get::<T>(query.limit(1))?.into_iter().next())
    }

    /// Looks a row up by its `id` column.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn find_by_id<T: RowShape>(&mut self, id: i64) -> Result<Option<T>, PersistenceError> {
        self.first::<T>(Query::new().filter(vec![Condition::new("id", id)]))
    }

    /// Returns true if a row with this `id` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn exists(&mut self, id: i64) -> Result<bool, PersistenceError> {
        let query: Query = Query::new()
            .select(["id"])
            .filter(vec![Condition::new("id", id)]);
        Ok(self.first::<IdRow>(query)?.is_some())
    }

    /// Inserts `record` and returns the generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is empty or the statement fails.
    pub fn insert(&mut self, record: &Record) -> Result<i64, PersistenceError> {
        let statement: Statement = record.to_insert(self.table)?;
        self.connection.run(|conn| conn.insert(&statement))
    }

    /// Applies `record` to every row matched by `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is empty or the statement fails.
    pub fn update(&mut self, query: Query, record: &Record) -> Result<usize, PersistenceError> {
        let statement: Statement = query.into_update(self.table, record)?;
        self.connection.run(|conn| conn.execute(&statement))
    }

    /// Deletes every row matched by `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn delete(&mut self, query: Query) -> Result<usize, PersistenceError> {
        let statement: Statement = query.into_delete(self.table);
        self.connection.run(|conn| conn.execute(&statement))
    }
}
