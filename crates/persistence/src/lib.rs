// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence core for the Stockroom inventory system.
//!
//! This crate is the data-access layer every inventory handler goes through.
//! It is built on Diesel and supports two backends.
//!
//! ## Components
//!
//! - [`ConnectionManager`]: one lazily created connection per accessor, with
//!   a single reconnect-and-retry on connection loss
//! - [`Query`]: an immutable statement description (projection, joins,
//!   predicate, grouping, ordering, limit) rendered to SQL with bound values
//! - [`EntityAccessor`]: a table-bound wrapper exposing the CRUD verbs
//! - [`Principals`] and [`Products`]: the business tables the audit log
//!   references
//! - [`AuditLogger`]: the append-only history table, tolerant of soft
//!   references that point at deleted rows
//!
//! ## Database Backend Support
//!
//! - **`SQLite`** (default): development, unit tests, integration tests
//! - **`MariaDB`/`MySQL`**: the deployment backend, validated via explicit
//!   opt-in tests (`cargo xtask test-mariadb`)
//!
//! ### Migration Strategy
//!
//! Due to `SQL` syntax differences between backends, we maintain separate
//! migration directories:
//!
//! - `migrations/`: `SQLite`-specific (default)
//! - `migrations_mysql/`: `MySQL`/`MariaDB`-specific
//!
//! Both produce identical schema semantics but use backend-appropriate syntax.
//!
//! ## Error Classification
//!
//! Every error surfaced by this crate is a [`PersistenceError`] whose
//! [`class`](PersistenceError::class) is one of [`ErrorClass`]. Backend error
//! codes are translated exactly once, when a Diesel error is converted.
//!
//! ## Testing Philosophy
//!
//! - Standard tests (`cargo test`) run against `SQLite` only
//! - Backend validation tests are explicitly marked `#[ignore]`
//! - External database tests never run automatically

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

/// Macro to generate monomorphic backend-specific query/mutation functions.
///
/// This macro generates two separate functions from a single function body:
/// - One suffixed with `_sqlite` taking `&mut SqliteConnection`
/// - One suffixed with `_mysql` taking `&mut MysqlConnection`
///
/// Diesel needs a concrete backend type to resolve bind and load bounds, so
/// the body is duplicated rather than made generic over the connection.
/// A single type parameter with one trait bound may be declared; it is
/// carried over to both generated functions unchanged.
///
/// # Constraints
///
/// - The macro ONLY duplicates function bodies and substitutes connection types
/// - No logic, branching, or dispatch occurs within the macro
/// - Backend dispatch happens exclusively on [`BackendConnection`]
///
/// # Usage
///
/// ```ignore
/// backend_fn! {
///     pub fn load_rows<T: RowShape>(conn: &mut _, statement: &Statement) -> Result<Vec<T>, PersistenceError> {
///         // Function body using conn - same for both backends
///     }
/// }
/// ```
///
/// This generates `load_rows_sqlite` and `load_rows_mysql`.
macro_rules! backend_fn {
    (
        $(#[$meta:meta])*
        $vis:vis fn $name:ident $(< $generic:ident : $bound:path >)? (
            $conn:ident : &mut _
            $(, $param:ident : $param_ty:ty)* $(,)?
        ) -> $ret:ty
        $body:block
    ) => {
        pastey::paste! {
            // Generate SQLite version
            $(#[$meta])*
            $vis fn [<$name _sqlite>] $(< $generic : $bound >)? (
                $conn: &mut SqliteConnection
                $(, $param : $param_ty)*
            ) -> $ret
            $body

            // Generate MySQL version
            $(#[$meta])*
            $vis fn [<$name _mysql>] $(< $generic : $bound >)? (
                $conn: &mut MysqlConnection
                $(, $param : $param_ty)*
            ) -> $ret
            $body
        }
    };
}

mod accessor;
mod audit_log;
mod backend;
mod clock;
mod connection;
mod data_models;
mod database;
mod entities;
mod error;
mod executor;
mod query;
mod value;

#[cfg(test)]
mod tests;

pub use accessor::EntityAccessor;
pub use audit_log::{
    AuditLogger, DEFAULT_HISTORY_LIMIT, DEFAULT_RETENTION_DAYS, ReferenceLookup,
    STATS_WINDOW_DAYS,
};
pub use clock::{Clock, SystemClock, format_timestamp, parse_timestamp};
pub use connection::{BackendConnection, ConnectionManager, Connector, DatabaseConfig};
pub use data_models::{IdRow, PrincipalRow, ProductRow};
pub use database::Database;
pub use entities::{DeletionReport, NewPrincipal, NewProduct, Principals, ProductFilter, Products};
pub use error::{ErrorClass, PersistenceError};
pub use executor::RowShape;
pub use query::{
    CONTRADICTION, Condition, Direction, JoinKind, NOT_NULL, Operator, Query, Statement,
    TAUTOLOGY,
};
pub use value::{Record, SqlValue};
