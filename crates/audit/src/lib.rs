// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Audit record types for the Stockroom inventory system.
//!
//! Every mutating business operation may append one audit record describing
//! who did what, to which principal or item, and what the row looked like
//! before and after. Records are immutable once persisted and are removed only
//! by retention pruning.
//!
//! The affected-principal and affected-item references are *soft* references:
//! the row they point at may disappear at any time, and the persistence layer
//! nulls them out instead of failing the write.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, PrimitiveDateTime};

#[cfg(test)]
mod tests;

/// Well-known action type classifications.
///
/// Action types are free text; these are the ones the inventory handlers emit.
pub mod actions {
    pub const PRODUCT_CREATED: &str = "Product Created";
    pub const PRODUCT_UPDATED: &str = "Product Updated";
    pub const PRODUCT_DELETED: &str = "Product Deleted";
    pub const USER_CREATED: &str = "User Created";
    pub const USER_UPDATED: &str = "User Updated";
    pub const USER_DELETED: &str = "User Deleted";
    pub const CATEGORY_CREATED: &str = "Category Created";
    pub const CATEGORY_UPDATED: &str = "Category Updated";
    pub const CATEGORY_DELETED: &str = "Category Deleted";
    pub const LOCATION_CREATED: &str = "Location Created";
    pub const LOCATION_UPDATED: &str = "Location Updated";
    pub const LOCATION_DELETED: &str = "Location Deleted";
}

/// A soft reference held by an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftReference {
    /// The affected principal (`target_user` column).
    TargetUser,
    /// The affected inventory item (`target_product` column).
    TargetProduct,
}

impl SoftReference {
    /// The order in which references are dropped when the backend does not
    /// say which one failed.
    pub const FALLBACK_ORDER: [Self; 2] = [Self::TargetUser, Self::TargetProduct];

    /// The column that stores this reference.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::TargetUser => "target_user",
            Self::TargetProduct => "target_product",
        }
    }

    /// Resolves a column name (optionally table-qualified or quoted) to a reference.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        let bare: &str = column
            .rsplit('.')
            .next()
            .unwrap_or(column)
            .trim_matches(|c| c == '`' || c == '"');
        match bare {
            "target_user" => Some(Self::TargetUser),
            "target_product" => Some(Self::TargetProduct),
            _ => None,
        }
    }

    /// The note appended to a description when this reference had to be dropped.
    #[must_use]
    pub fn annotation(self, id: i64) -> String {
        match self {
            Self::TargetUser => format!(" (user {id} already deleted)"),
            Self::TargetProduct => format!(" (product {id} already deleted)"),
        }
    }
}

impl std::fmt::Display for SoftReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// The input to one audit log write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Free-text classification, e.g. [`actions::PRODUCT_CREATED`].
    pub action_type: String,
    /// The principal performing the action.
    pub performed_by: i64,
    /// The principal affected by the action, if any.
    pub target_user: Option<i64>,
    /// The inventory item affected by the action, if any.
    pub target_product: Option<i64>,
    /// Snapshot of the affected row before the action.
    pub old_value: Option<Value>,
    /// Snapshot of the affected row after the action.
    pub new_value: Option<Value>,
    /// Human-readable description.
    pub description: String,
}

impl NewAuditEntry {
    /// Creates an entry with no references and no snapshots.
    #[must_use]
    pub fn new(
        action_type: impl Into<String>,
        performed_by: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            performed_by,
            target_user: None,
            target_product: None,
            old_value: None,
            new_value: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub const fn with_target_user(mut self, user_id: i64) -> Self {
        self.target_user = Some(user_id);
        self
    }

    #[must_use]
    pub const fn with_target_product(mut self, product_id: i64) -> Self {
        self.target_product = Some(product_id);
        self
    }

    #[must_use]
    pub fn with_old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }

    /// Returns the id held by the given soft reference.
    #[must_use]
    pub const fn reference(&self, reference: SoftReference) -> Option<i64> {
        match reference {
            SoftReference::TargetUser => self.target_user,
            SoftReference::TargetProduct => self.target_product,
        }
    }

    /// Clears a soft reference without touching the description.
    pub const fn clear_reference(&mut self, reference: SoftReference) {
        match reference {
            SoftReference::TargetUser => self.target_user = None,
            SoftReference::TargetProduct => self.target_product = None,
        }
    }

    /// Returns a copy with the given reference dropped and the description
    /// annotated with the id that went missing.
    ///
    /// Returns `None` if the reference is not set.
    #[must_use]
    pub fn without_reference(&self, reference: SoftReference) -> Option<Self> {
        let id: i64 = self.reference(reference)?;
        let mut entry: Self = self.clone();
        entry.clear_reference(reference);
        entry.description.push_str(&reference.annotation(id));
        Some(entry)
    }
}

/// A persisted audit record joined with display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action_type: String,
    pub performed_by: i64,
    pub performed_by_name: Option<String>,
    pub target_user: Option<i64>,
    pub target_user_name: Option<String>,
    pub target_product: Option<i64>,
    pub target_product_name: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: String,
    pub created_at: PrimitiveDateTime,
}

/// Count of audit records for one action type on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStat {
    pub action_type: String,
    pub day: Date,
    pub count: i64,
}

/// Result of a best-effort audit write.
///
/// A destructive business operation records its audit entry on a best-effort
/// basis: the operation proceeds either way, and the caller learns which of
/// the two happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The entry was persisted with this id.
    Recorded { entry_id: i64 },
    /// The entry could not be persisted; the operation went ahead regardless.
    Failed { reason: String },
}

impl AuditOutcome {
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }

    #[must_use]
    pub const fn entry_id(&self) -> Option<i64> {
        match self {
            Self::Recorded { entry_id } => Some(*entry_id),
            Self::Failed { .. } => None,
        }
    }
}
