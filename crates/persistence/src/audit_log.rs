// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The append-only audit history.
//!
//! ## Soft references
//!
//! An audit record may point at an affected principal and an affected
//! inventory item. Either row can be deleted at any moment, including between
//! the moment a handler decides to log and the moment the record is inserted.
//! A log write therefore never fails merely because a referenced row is gone:
//!
//! 1. Before inserting, each set reference is looked up. An unresolved
//!    reference is nulled silently.
//! 2. If the insert still fails with a foreign-key violation, the offending
//!    reference is nulled, the description is annotated with the missing id,
//!    and the insert is retried. The backend names the column on `MySQL`.
//!    `SQLite` does not, so every set reference is looked up again and the
//!    ones that no longer resolve are dropped. If all of them still resolve,
//!    the first set reference in [`SoftReference::FALLBACK_ORDER`] goes.
//!
//! Each retry drops at least one reference, so a write retries at most twice.
//!
//! ## Best-effort writes
//!
//! [`AuditLogger::record_best_effort`] is the policy used by destructive
//! operations: any failure is logged and reported as
//! [`AuditOutcome::Failed`], and the caller proceeds.

use std::sync::Arc;

use serde_json::Value;
use stockroom_audit::{AuditLogEntry, AuditOutcome, HistoryStat, NewAuditEntry, SoftReference};
use time::macros::format_description;
use time::{Date, Duration, PrimitiveDateTime};
use tracing::{debug, info, warn};

use crate::accessor::EntityAccessor;
use crate::clock::{Clock, SystemClock, format_timestamp, parse_timestamp};
use crate::data_models::{HistoryRow, HistoryStatRow};
use crate::database::Database;
use crate::entities::{Principals, Products};
use crate::error::PersistenceError;
use crate::query::{Condition, Direction, Operator, Query};
use crate::value::Record;

/// Row cap of [`AuditLogger::get_history`].
pub const DEFAULT_HISTORY_LIMIT: u64 = 1000;

/// Default retention threshold for [`AuditLogger::clean_old_logs`].
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Trailing window of [`AuditLogger::get_history_stats`].
pub const STATS_WINDOW_DAYS: u32 = 30;

const HISTORY_TABLE: &str = "history";

const ENTRY_COLUMNS: [&str; 12] = [
    "history.id AS id",
    "history.action_type AS action_type",
    "history.performed_by AS performed_by",
    "performer.name AS performed_by_name",
    "history.target_user AS target_user",
    "affected_user.name AS target_user_name",
    "history.target_product AS target_product",
    "affected_product.part_number AS target_product_name",
    "history.old_value AS old_value",
    "history.new_value AS new_value",
    "history.description AS description",
    "history.created_at AS created_at",
];

const DAY_EXPR: &str = "SUBSTR(history.created_at, 1, 10)";

/// Resolves whether a referenced row still exists.
pub trait ReferenceLookup: Send {
    /// Returns true if a row with `id` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn resolves(&mut self, id: i64) -> Result<bool, PersistenceError>;
}

pub struct AuditLogger {
    accessor: EntityAccessor,
    principals: Box<dyn ReferenceLookup>,
    products: Box<dyn ReferenceLookup>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("accessor", &self.accessor)
            .finish_non_exhaustive()
    }
}

impl AuditLogger {
    /// Creates a logger with principal and product lookups on the same database.
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self::with_lookups(
            database,
            Box::new(Principals::new(database)),
            Box::new(Products::new(database)),
        )
    }

    /// Creates a logger with caller-supplied reference lookups.
    #[must_use]
    pub fn with_lookups(
        database: &Database,
        principals: Box<dyn ReferenceLookup>,
        products: Box<dyn ReferenceLookup>,
    ) -> Self {
        Self {
            accessor: EntityAccessor::new(database, HISTORY_TABLE),
            principals,
            products,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Appends an audit record and returns its id.
    ///
    /// References to rows that no longer exist are nulled rather than failing
    /// the write; see the module documentation.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails, a snapshot cannot be serialized,
    /// or the insert fails for any reason other than a droppable reference.
    pub fn register_log(&mut self, mut entry: NewAuditEntry) -> Result<i64, PersistenceError> {
        self.drop_unresolved(&mut entry)?;

        loop {
            let err: PersistenceError = match self.insert_entry(&entry) {
                Ok(entry_id) => {
                    info!(
                        entry_id,
                        action_type = %entry.action_type,
                        target_user = ?entry.target_user,
                        target_product = ?entry.target_product,
                        "Audit entry recorded"
                    );
                    return Ok(entry_id);
                }
                Err(err) => err,
            };

            let PersistenceError::ForeignKeyViolation { column, .. } = &err else {
                return Err(err);
            };
            let dropped: Vec<SoftReference> = match column.as_deref() {
                Some(column) => SoftReference::from_column(column).into_iter().collect(),
                None => self.stale_references(&entry)?,
            };
            let mut retry: Option<NewAuditEntry> = None;
            for reference in dropped {
                let current: &NewAuditEntry = retry.as_ref().unwrap_or(&entry);
                if let Some(next) = current.without_reference(reference) {
                    retry = Some(next);
                }
            }
            let Some(retry) = retry else {
                return Err(err);
            };

            warn!(
                error = %err,
                action_type = %entry.action_type,
                "Audit insert hit a missing reference, retrying without it"
            );
            entry = retry;
        }
    }

    /// References to drop after a foreign-key violation that did not name
    /// its column.
    ///
    /// Every still-set reference is looked up again and the ones that no
    /// longer resolve are returned. If all of them still resolve, the first
    /// set reference in [`SoftReference::FALLBACK_ORDER`] is returned.
    fn stale_references(
        &mut self,
        entry: &NewAuditEntry,
    ) -> Result<Vec<SoftReference>, PersistenceError> {
        let mut stale: Vec<SoftReference> = Vec::new();
        let mut first_set: Option<SoftReference> = None;
        for reference in SoftReference::FALLBACK_ORDER {
            let Some(id) = entry.reference(reference) else {
                continue;
            };
            first_set = first_set.or(Some(reference));
            if !self.lookup(reference).resolves(id)? {
                stale.push(reference);
            }
        }
        if stale.is_empty() {
            stale.extend(first_set);
        }
        Ok(stale)
    }

    fn lookup(&mut self, reference: SoftReference) -> &mut dyn ReferenceLookup {
        match reference {
            SoftReference::TargetUser => self.principals.as_mut(),
            SoftReference::TargetProduct => self.products.as_mut(),
        }
    }

    /// Appends an audit record, reporting failure instead of returning it.
    pub fn record_best_effort(&mut self, entry: NewAuditEntry) -> AuditOutcome {
        let action_type: String = entry.action_type.clone();
        match self.register_log(entry) {
            Ok(entry_id) => AuditOutcome::Recorded { entry_id },
            Err(err) => {
                warn!(
                    error = %err,
                    class = %err.class(),
                    action_type = %action_type,
                    "Audit entry not recorded, continuing"
                );
                AuditOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn drop_unresolved(&mut self, entry: &mut NewAuditEntry) -> Result<(), PersistenceError> {
        if let Some(user_id) = entry.target_user {
            let resolves: bool = self.principals.resolves(user_id)?;
            if !resolves {
                warn!(user_id, "Affected principal does not exist, storing null reference");
                entry.clear_reference(SoftReference::TargetUser);
            }
        }
        if let Some(product_id) = entry.target_product {
            let resolves: bool = self.products.resolves(product_id)?;
            if !resolves {
                warn!(product_id, "Affected product does not exist, storing null reference");
                entry.clear_reference(SoftReference::TargetProduct);
            }
        }
        Ok(())
    }

    fn insert_entry(&mut self, entry: &NewAuditEntry) -> Result<i64, PersistenceError> {
        let record: Record = Record::new()
            .set("action_type", &entry.action_type)
            .set("performed_by", entry.performed_by)
            .set("target_user", entry.target_user)
            .set("target_product", entry.target_product)
            .set("old_value", snapshot(entry.old_value.as_ref())?)
            .set("new_value", snapshot(entry.new_value.as_ref())?)
            .set("description", &entry.description)
            .set("created_at", format_timestamp(self.clock.now())?);
        self.accessor.insert(&record)
    }

    /// The most recent [`DEFAULT_HISTORY_LIMIT`] records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_history(&mut self) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.get_history_limited(DEFAULT_HISTORY_LIMIT)
    }

    /// The most recent `limit` records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_history_limited(&mut self, limit: u64) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.load_entries(entry_query().limit(limit))
    }

    /// Records of one action type, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_logs_by_type(&mut self, action_type: &str) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.load_entries(
            entry_query().filter(vec![Condition::new("history.action_type", action_type)]),
        )
    }

    /// Records where the principal is either the actor or the affected principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_logs_by_user(&mut self, user_id: i64) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.load_entries(entry_query().filter(vec![Condition::any_of(
            ["history.performed_by", "history.target_user"],
            Operator::Eq,
            user_id,
        )]))
    }

    /// Records referencing one inventory item.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_logs_by_product(&mut self, product_id: i64) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.load_entries(
            entry_query().filter(vec![Condition::new("history.target_product", product_id)]),
        )
    }

    /// Records created within `[start, end]`, both bounds inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_logs_by_date_range(
        &mut self,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        self.load_entries(entry_query().filter(vec![
            Condition::with_op("history.created_at", Operator::Ge, format_timestamp(start)?),
            Condition::with_op("history.created_at", Operator::Le, format_timestamp(end)?),
        ]))
    }

    /// Record counts per action type and day over the last
    /// [`STATS_WINDOW_DAYS`] days, newest day first, then highest count.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored day cannot be parsed.
    pub fn get_history_stats(&mut self) -> Result<Vec<HistoryStat>, PersistenceError> {
        let since: PrimitiveDateTime = self.days_ago(STATS_WINDOW_DAYS)?;
        let query: Query = Query::new()
            .select([
                "history.action_type AS action_type".to_string(),
                format!("{DAY_EXPR} AS day"),
                "COUNT(*) AS total".to_string(),
            ])
            .filter(vec![Condition::with_op(
                "history.created_at",
                Operator::Ge,
                format_timestamp(since)?,
            )])
            .group_by(["history.action_type", DAY_EXPR])
            .order_by([
                ("day", Direction::Desc),
                ("total", Direction::Desc),
                ("action_type", Direction::Asc),
            ]);

        let rows: Vec<HistoryStatRow> = self.accessor.get(query)?;
        rows.into_iter().map(stat_from_row).collect()
    }

    /// Deletes records created strictly before `now - days_to_keep` and
    /// returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clean_old_logs(&mut self, days_to_keep: u32) -> Result<usize, PersistenceError> {
        let cutoff: PrimitiveDateTime = self.days_ago(days_to_keep)?;
        let query: Query = Query::new().filter(vec![Condition::with_op(
            "created_at",
            Operator::Lt,
            format_timestamp(cutoff)?,
        )]);
        let removed: usize = self.accessor.delete(query)?;
        info!(removed, days_to_keep, "Pruned audit history");
        Ok(removed)
    }

    fn days_ago(&self, days: u32) -> Result<PrimitiveDateTime, PersistenceError> {
        self.clock
            .now()
            .checked_sub(Duration::days(i64::from(days)))
            .ok_or_else(|| PersistenceError::Other(format!("{days} days ago is out of range")))
    }

    fn load_entries(&mut self, query: Query) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        let rows: Vec<HistoryRow> = self.accessor.get(query)?;
        debug!(rows = rows.len(), "Loaded audit entries");
        rows.into_iter().map(entry_from_row).collect()
    }

    /// Drops the logger's own connection.
    pub fn close(&mut self) {
        self.accessor.close();
    }
}

impl ReferenceLookup for Principals {
    fn resolves(&mut self, id: i64) -> Result<bool, PersistenceError> {
        self.exists(id)
    }
}

impl ReferenceLookup for Products {
    fn resolves(&mut self, id: i64) -> Result<bool, PersistenceError> {
        self.exists(id)
    }
}

/// Every read goes through the same projection, joins and ordering.
fn entry_query() -> Query {
    Query::new()
        .select(ENTRY_COLUMNS)
        .left_join("users performer", "history.performed_by = performer.id")
        .left_join("users affected_user", "history.target_user = affected_user.id")
        .left_join(
            "products affected_product",
            "history.target_product = affected_product.id",
        )
        .order_by([
            ("history.created_at", Direction::Desc),
            ("history.id", Direction::Desc),
        ])
}

fn snapshot(value: Option<&Value>) -> Result<Option<String>, PersistenceError> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

fn restore(text: Option<&str>) -> Result<Option<Value>, PersistenceError> {
    Ok(text.map(serde_json::from_str::<Value>).transpose()?)
}

fn entry_from_row(row: HistoryRow) -> Result<AuditLogEntry, PersistenceError> {
    Ok(AuditLogEntry {
        id: row.id,
        action_type: row.action_type,
        performed_by: row.performed_by,
        performed_by_name: row.performed_by_name,
        target_user: row.target_user,
        target_user_name: row.target_user_name,
        target_product: row.target_product,
        target_product_name: row.target_product_name,
        old_value: restore(row.old_value.as_deref())?,
        new_value: restore(row.new_value.as_deref())?,
        description: row.description,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn stat_from_row(row: HistoryStatRow) -> Result<HistoryStat, PersistenceError> {
    let day: Date = Date::parse(&row.day, format_description!("[year]-[month]-[day]"))
        .map_err(|e| PersistenceError::ReconstructionError(format!("day '{}': {e}", row.day)))?;
    Ok(HistoryStat {
        action_type: row.action_type,
        day,
        count: row.total,
    })
}
