// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use serde_json::Value;
use stockroom_audit::{AuditOutcome, NewAuditEntry, actions};
use tracing::{info, warn};

use crate::accessor::EntityAccessor;
use crate::audit_log::AuditLogger;
use crate::clock::{Clock, SystemClock, format_timestamp};
use crate::data_models::ProductRow;
use crate::database::Database;
use crate::error::PersistenceError;
use crate::query::{Condition, Direction, Operator, Query};
use crate::value::Record;

const PRODUCTS_TABLE: &str = "products";

/// Input for creating an inventory item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewProduct {
    pub part_number: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    pub price: f64,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub status: i64,
}

impl NewProduct {
    #[must_use]
    pub fn new(part_number: impl Into<String>) -> Self {
        Self {
            part_number: part_number.into(),
            ..Self::default()
        }
    }
}

/// Search criteria for [`Products::search`]. Unset fields do not filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    /// Substring of the part number.
    pub part_number: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Substring of the brand.
    pub brand: Option<String>,
    /// Exact status.
    pub status: Option<i64>,
}

impl ProductFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions: Vec<Condition> = Vec::new();
        if let Some(part_number) = &self.part_number {
            conditions.push(Condition::with_op(
                "part_number",
                Operator::Like,
                format!("%{part_number}%"),
            ));
        }
        if let Some(category) = &self.category {
            conditions.push(Condition::new("category", category));
        }
        if let Some(brand) = &self.brand {
            conditions.push(Condition::with_op(
                "brand",
                Operator::Like,
                format!("%{brand}%"),
            ));
        }
        if let Some(status) = self.status {
            conditions.push(Condition::new("status", status));
        }
        conditions
    }
}

/// What [`Products::delete_audited`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    /// Rows removed from `products`.
    pub removed: usize,
    /// Whether the deletion made it into the audit history.
    pub audit: AuditOutcome,
}

/// Accessor for the `products` table.
pub struct Products {
    accessor: EntityAccessor,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Products {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Products")
            .field("accessor", &self.accessor)
            .finish_non_exhaustive()
    }
}

impl Products {
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            accessor: EntityAccessor::new(database, PRODUCTS_TABLE),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates an item and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::DuplicateKey`] if the part number exists.
    pub fn create(&mut self, product: &NewProduct) -> Result<i64, PersistenceError> {
        let record: Record = Record::new()
            .set("part_number", &product.part_number)
            .set("description", product.description.as_deref())
            .set("brand", product.brand.as_deref())
            .set("category", product.category.as_deref())
            .set("quantity", product.quantity)
            .set("min_stock", product.min_stock)
            .set("max_stock", product.max_stock)
            .set("price", product.price)
            .set("location", product.location.as_deref())
            .set("supplier", product.supplier.as_deref())
            .set("status", product.status)
            .set("created_at", format_timestamp(self.clock.now())?);
        let product_id: i64 = self.accessor.insert(&record)?;

        info!(product_id, part_number = %product.part_number, "Product created");
        Ok(product_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_by_id(&mut self, id: i64) -> Result<Option<ProductRow>, PersistenceError> {
        self.accessor.find_by_id(id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn exists(&mut self, id: i64) -> Result<bool, PersistenceError> {
        self.accessor.exists(id)
    }

    /// Applies `changes` to one item, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update(&mut self, id: i64, changes: &Record) -> Result<usize, PersistenceError> {
        let record: Record = changes
            .clone()
            .set("updated_at", format_timestamp(self.clock.now())?);
        self.accessor
            .update(Query::new().filter(vec![Condition::new("id", id)]), &record)
    }

    /// Deletes one item without auditing.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&mut self, id: i64) -> Result<usize, PersistenceError> {
        self.accessor
            .delete(Query::new().filter(vec![Condition::new("id", id)]))
    }

    /// Deletes one item after recording the deletion, best effort.
    ///
    /// The audit entry is written while the row still exists, with the full
    /// row as its before-snapshot. If the entry cannot be written the
    /// deletion proceeds anyway and the report says so.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if the item does not exist, or
    /// an error if the delete itself fails.
    pub fn delete_audited(
        &mut self,
        id: i64,
        performed_by: i64,
        audit: &mut AuditLogger,
    ) -> Result<DeletionReport, PersistenceError> {
        let product: ProductRow = self
            .find_by_id(id)?
            .ok_or_else(|| PersistenceError::NotFound(format!("Product {id} not found")))?;

        let snapshot: Value = serde_json::to_value(&product)?;
        let entry: NewAuditEntry = NewAuditEntry::new(
            actions::PRODUCT_DELETED,
            performed_by,
            format!("Deleted product {}", product.part_number),
        )
        .with_target_product(id)
        .with_old_value(snapshot);
        let outcome: AuditOutcome = audit.record_best_effort(entry);
        if !outcome.is_recorded() {
            warn!(product_id = id, "Deleting product without an audit entry");
        }

        let removed: usize = self.delete(id)?;
        info!(product_id = id, removed, "Product deleted");
        Ok(DeletionReport {
            removed,
            audit: outcome,
        })
    }

    /// Every item, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&mut self) -> Result<Vec<ProductRow>, PersistenceError> {
        self.accessor.get(newest_first(Query::new()))
    }

    /// Items matching every set criterion, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search(&mut self, filter: &ProductFilter) -> Result<Vec<ProductRow>, PersistenceError> {
        self.accessor
            .get(newest_first(Query::new().filter(filter.conditions())))
    }
}

fn newest_first(query: Query) -> Query {
    query.order_by([("created_at", Direction::Desc), ("id", Direction::Desc)])
}
