// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row shapes loaded from rendered statements.
//!
//! Every struct here derives `QueryableByName`, so the field names must match
//! the column names (or aliases) the statement projects.

use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Double, Nullable, Text};
use serde::Serialize;

/// A single generated or selected identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, QueryableByName)]
pub struct IdRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
}

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName, Serialize)]
pub struct PrincipalRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub account: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    #[diesel(sql_type = Text)]
    pub password_hash: String,
    #[diesel(sql_type = Text)]
    pub role: String,
    #[diesel(sql_type = BigInt)]
    pub status: i64,
}

/// A row of the `products` table.
///
/// Serialized as-is into audit snapshots.
#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize)]
pub struct ProductRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub part_number: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub description: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub brand: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub category: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub quantity: i64,
    #[diesel(sql_type = BigInt)]
    pub min_stock: i64,
    #[diesel(sql_type = BigInt)]
    pub max_stock: i64,
    #[diesel(sql_type = Double)]
    pub price: f64,
    #[diesel(sql_type = Nullable<Text>)]
    pub location: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub supplier: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub status: i64,
    #[diesel(sql_type = Text)]
    pub created_at: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub updated_at: Option<String>,
}

/// A `history` row joined with display names.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct HistoryRow {
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub action_type: String,
    #[diesel(sql_type = BigInt)]
    pub performed_by: i64,
    #[diesel(sql_type = Nullable<Text>)]
    pub performed_by_name: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub target_user: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    pub target_user_name: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub target_product: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    pub target_product_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub old_value: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub new_value: Option<String>,
    #[diesel(sql_type = Text)]
    pub description: String,
    #[diesel(sql_type = Text)]
    pub created_at: String,
}

/// One `(action_type, day)` group of the statistics query.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct HistoryStatRow {
    #[diesel(sql_type = Text)]
    pub action_type: String,
    #[diesel(sql_type = Text)]
    pub day: String,
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}
