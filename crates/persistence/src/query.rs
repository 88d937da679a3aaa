// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Statement descriptions and rendering.
//!
//! A [`Query`] describes one pending statement: projection, joins, predicate,
//! grouping, ordering and row limit. It is a plain value; every configuration
//! method consumes it and returns the updated query, so two logical
//! operations can never observe each other's half-built state. Terminal
//! operations on an [`EntityAccessor`](crate::EntityAccessor) take the query by
//! value and discard it afterward, whether or not execution succeeded.
//!
//! Table names, column names and join conditions are trusted SQL fragments
//! supplied by this crate's accessors. Only values are bound.

use crate::error::PersistenceError;
use crate::value::{Record, SqlValue};

/// The always-true predicate used when no conditions are given.
pub const TAUTOLOGY: &str = "1=1";

/// The always-false term an empty [`Condition::any_of`] renders to.
pub const CONTRADICTION: &str = "1=0";

/// Marker value that turns an `IS` condition into `IS NOT NULL`.
pub const NOT_NULL: &str = "NOT NULL";

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    Is,
}

impl Operator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::Is => "IS",
        }
    }
}

/// One predicate term. Terms are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    fields: Vec<String>,
    operator: Operator,
    value: SqlValue,
}

impl Condition {
    /// `field = ?`
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::with_op(field, Operator::Eq, value)
    }

    /// `field <op> ?`, with the `IS NULL` / `IS NOT NULL` special cases for [`Operator::Is`].
    #[must_use]
    pub fn with_op(field: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            fields: vec![field.into()],
            operator,
            value: value.into(),
        }
    }

    /// `field IS NULL`
    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::with_op(field, Operator::Is, SqlValue::Null)
    }

    /// `field IS NOT NULL`
    #[must_use]
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::with_op(field, Operator::Is, NOT_NULL)
    }

    /// `(a <op> ? OR b <op> ?)`, binding the value once per field.
    ///
    /// With no fields the term matches nothing and binds nothing.
    #[must_use]
    pub fn any_of<I, S>(fields: I, operator: Operator, value: impl Into<SqlValue>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            operator,
            value: value.into(),
        }
    }

    /// Renders this term, pushing its bound values in placeholder order.
    fn render(&self, binds: &mut Vec<SqlValue>) -> String {
        if self.operator == Operator::Is {
            if self.value.is_null() {
                return self.render_each(|field| format!("{field} IS NULL"));
            }
            if self.value.as_text() == Some(NOT_NULL) {
                return self.render_each(|field| format!("{field} IS NOT NULL"));
            }
        }
        let op: &str = self.operator.as_sql();
        let rendered: String = self.render_each(|field| format!("{field} {op} ?"));
        binds.extend(std::iter::repeat_n(self.value.clone(), self.fields.len()));
        rendered
    }

    fn render_each(&self, term: impl Fn(&str) -> String) -> String {
        match self.fields.as_slice() {
            [] => CONTRADICTION.to_string(),
            [single] => term(single),
            fields => {
                let terms: Vec<String> = fields.iter().map(|field| term(field)).collect();
                format!("({})", terms.join(" OR "))
            }
        }
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Join {
    table: String,
    condition: String,
    kind: JoinKind,
}

/// A rendered statement: SQL text with `?` placeholders and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    binds: Vec<SqlValue>,
}

impl Statement {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn binds(&self) -> &[SqlValue] {
        &self.binds
    }

    /// Number of `?` placeholders in the SQL text.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Immutable description of one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    projection: Vec<String>,
    joins: Vec<Join>,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    order_by: Vec<(String, Direction)>,
    limit: Option<u64>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection. An empty list means all columns.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a join clause. Joins accumulate.
    #[must_use]
    pub fn join(
        mut self,
        table: impl Into<String>,
        condition: impl Into<String>,
        kind: JoinKind,
    ) -> Self {
        self.joins.push(Join {
            table: table.into(),
            condition: condition.into(),
            kind,
        });
        self
    }

    #[must_use]
    pub fn inner_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.join(table, condition, JoinKind::Inner)
    }

    #[must_use]
    pub fn left_join(self, table: impl Into<String>, condition: impl Into<String>) -> Self {
        self.join(table, condition, JoinKind::Left)
    }

    /// Replaces the whole predicate with the given `AND`-joined conditions.
    #[must_use]
    pub fn filter(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    #[must_use]
    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: Into<String>,
    {
        self.order_by = fields
            .into_iter()
            .map(|(field, direction)| (field.into(), direction))
            .collect();
        self
    }

    #[must_use]
    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn limit(mut self, rows: u64) -> Self {
        self.limit = Some(rows);
        self
    }

    /// Discards every accumulated clause.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// Returns true if nothing has been configured.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Renders the predicate and its binds.
    #[must_use]
    pub fn predicate(&self) -> (String, Vec<SqlValue>) {
        let mut binds: Vec<SqlValue> = Vec::new();
        if self.conditions.is_empty() {
            return (TAUTOLOGY.to_string(), binds);
        }
        let clauses: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| condition.render(&mut binds))
            .collect();
        (clauses.join(" AND "), binds)
    }

    /// `SELECT <projection> FROM <table> <joins> WHERE <predicate> <group> <order> <limit>`
    #[must_use]
    pub fn into_select(self, table: &str) -> Statement {
        let (predicate, binds) = self.predicate();
        let projection: String = if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection.join(", ")
        };

        let mut parts: Vec<String> = vec![format!("SELECT {projection} FROM {table}")];
        parts.extend(self.joins.iter().map(|join| {
            format!(
                "{} JOIN {} ON {}",
                join.kind.as_sql(),
                join.table,
                join.condition
            )
        }));
        parts.push(format!("WHERE {predicate}"));
        if !self.group_by.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(field, direction)| format!("{field} {}", direction.as_sql()))
                .collect();
            parts.push(format!("ORDER BY {}", order.join(", ")));
        }
        if let Some(rows) = self.limit {
            parts.push(format!("LIMIT {rows}"));
        }

        Statement {
            sql: parts.join(" "),
            binds,
        }
    }

    /// `UPDATE <table> SET <assignments> WHERE <predicate>`
    ///
    /// Assignment values are bound first, in record order, followed by the
    /// predicate values.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no columns.
    pub fn into_update(self, table: &str, record: &Record) -> Result<Statement, PersistenceError> {
        if record.is_empty() {
            return Err(PersistenceError::InvalidStatement(format!(
                "UPDATE on {table} with no assignments"
            )));
        }
        let (predicate, predicate_binds) = self.predicate();
        let assignments: Vec<String> = record.columns().map(|column| format!("{column} = ?")).collect();
        let mut binds: Vec<SqlValue> = record.values().cloned().collect();
        binds.extend(predicate_binds);

        Ok(Statement {
            sql: format!(
                "UPDATE {table} SET {} WHERE {predicate}",
                assignments.join(", ")
            ),
            binds,
        })
    }

    /// `DELETE FROM <table> WHERE <predicate>`
    #[must_use]
    pub fn into_delete(self, table: &str) -> Statement {
        let (predicate, binds) = self.predicate();
        Statement {
            sql: format!("DELETE FROM {table} WHERE {predicate}"),
            binds,
        }
    }
}

impl Record {
    /// `INSERT INTO <table> (<columns>) VALUES (?, ...)`
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no columns.
    pub fn to_insert(&self, table: &str) -> Result<Statement, PersistenceError> {
        if self.is_empty() {
            return Err(PersistenceError::InvalidStatement(format!(
                "INSERT into {table} with no columns"
            )));
        }
        let columns: Vec<&str> = self.columns().collect();
        let placeholders: Vec<&str> = vec!["?"; columns.len()];
        Ok(Statement {
            sql: format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ),
            binds: self.values().cloned().collect(),
        })
    }
}
