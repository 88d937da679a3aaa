// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Business-entity accessors.
//!
//! These are the callers the audit log references: principals (the `users`
//! table) and inventory items (the `products` table). Each wraps one
//! [`EntityAccessor`](crate::EntityAccessor) and adds the table-specific
//! queries its handlers need.

mod principals;
mod products;

pub use principals::{NewPrincipal, Principals};
pub use products::{DeletionReport, NewProduct, ProductFilter, Products};
