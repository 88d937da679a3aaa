// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Execution of rendered statements.
//!
//! A [`Statement`] is run through `diesel::sql_query`, with each bound value
//! attached according to its variant. Row sets are loaded into caller-chosen
//! [`RowShape`] structs derived with `QueryableByName`.

use diesel::backend::Backend;
use diesel::deserialize::QueryableByName;
use diesel::mysql::Mysql;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::serialize::ToSql;
use diesel::sql_types::{BigInt, Double, HasSqlType, Nullable, Text};
use diesel::sqlite::Sqlite;
use diesel::{MysqlConnection, SqliteConnection};
use tracing::debug;

use crate::backend::PersistenceBackend;
use crate::connection::BackendConnection;
use crate::error::PersistenceError;
use crate::query::Statement;
use crate::value::SqlValue;

/// A row type that can be loaded from either backend.
///
/// Implemented automatically for every `#[derive(QueryableByName)]` struct
/// whose field types work on both backends.
pub trait RowShape: QueryableByName<Sqlite> + QueryableByName<Mysql> + 'static {}

impl<T> RowShape for T where T: QueryableByName<Sqlite> + QueryableByName<Mysql> + 'static {}

/// Attaches bound values to a boxed raw query, in placeholder order.
fn bind_values<'f, DB>(
    mut query: BoxedSqlQuery<'f, DB, SqlQuery>,
    values: &[SqlValue],
) -> BoxedSqlQuery<'f, DB, SqlQuery>
where
    DB: Backend + HasSqlType<BigInt> + HasSqlType<Double> + HasSqlType<Text>,
    i64: ToSql<BigInt, DB>,
    f64: ToSql<Double, DB>,
    String: ToSql<Text, DB>,
    Option<String>: ToSql<Nullable<Text>, DB>,
{
    for value in values {
        query = match value {
            SqlValue::Null => query.bind::<Nullable<Text>, _>(None::<String>),
            SqlValue::Integer(v) => query.bind::<BigInt, _>(*v),
            SqlValue::Real(v) => query.bind::<Double, _>(*v),
            SqlValue::Text(v) => query.bind::<Text, _>(v.clone()),
        };
    }
    query
}

backend_fn! {
/// Loads every row produced by a `SELECT` statement.
///
/// # Errors
///
/// Returns an error if the statement fails or a row does not match `T`.
pub fn load_rows<T: RowShape>(
    conn: &mut _,
    statement: &Statement,
) -> Result<Vec<T>, PersistenceError> {
    let query = bind_values(
        diesel::sql_query(statement.sql()).into_boxed(),
        statement.binds(),
    );
    Ok(query.load::<T>(conn)?)
}
}

backend_fn! {
/// Executes a statement and returns the number of affected rows.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn execute_statement(conn: &mut _, statement: &Statement) -> Result<usize, PersistenceError> {
    let query = bind_values(
        diesel::sql_query(statement.sql()).into_boxed(),
        statement.binds(),
    );
    Ok(query.execute(conn)?)
}
}

backend_fn! {
/// Executes an `INSERT` and returns the generated identifier.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub fn insert_statement(conn: &mut _, statement: &Statement) -> Result<i64, PersistenceError> {
    let query = bind_values(
        diesel::sql_query(statement.sql()).into_boxed(),
        statement.binds(),
    );
    query.execute(conn)?;
    conn.get_last_insert_rowid()
}
}

impl BackendConnection {
    /// Runs a `SELECT` and loads its rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn load<T: RowShape>(&mut self, statement: &Statement) -> Result<Vec<T>, PersistenceError> {
        debug!(sql = statement.sql(), binds = statement.binds().len(), "Executing select");
        match self {
            Self::Sqlite(conn) => load_rows_sqlite::<T>(conn, statement),
            Self::Mysql(conn) => load_rows_mysql::<T>(conn, statement),
        }
    }

    /// Runs an `UPDATE` or `DELETE` and returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn execute(&mut self, statement: &Statement) -> Result<usize, PersistenceError> {
        debug!(sql = statement.sql(), binds = statement.binds().len(), "Executing statement");
        match self {
            Self::Sqlite(conn) => execute_statement_sqlite(conn, statement),
            Self::Mysql(conn) => execute_statement_mysql(conn, statement),
        }
    }

    /// Runs an `INSERT` and returns the generated identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn insert(&mut self, statement: &Statement) -> Result<i64, PersistenceError> {
        debug!(sql = statement.sql(), binds = statement.binds().len(), "Executing insert");
        match self {
            Self::Sqlite(conn) => insert_statement_sqlite(conn, statement),
            Self::Mysql(conn) => insert_statement_mysql(conn, statement),
        }
    }
}
