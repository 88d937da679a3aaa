// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod accessor_tests;
mod connection_tests;
mod error_tests;
mod initialization_tests;
mod query_tests;

use std::sync::{Arc, Mutex};

use time::macros::datetime;
use time::{Duration, PrimitiveDateTime};

use crate::{
    AuditLogger, Clock, Database, NewPrincipal, NewProduct, PersistenceError, Principals,
    Products, ReferenceLookup,
};

/// bcrypt's minimum cost keeps principal creation fast in tests.
pub const TEST_HASH_COST: u32 = 4;

pub fn create_test_database() -> Database {
    Database::new_in_memory().expect("Failed to create in-memory database")
}

/// The instant every [`ManualClock`] starts at.
pub const fn test_epoch() -> PrimitiveDateTime {
    datetime!(2026-03-01 12:00:00)
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<PrimitiveDateTime>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Self::at(test_epoch())
    }

    pub fn at(now: PrimitiveDateTime) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn set(&self, now: PrimitiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> PrimitiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// A lookup with a fixed answer, standing in for a row that vanishes
/// between the proactive check and the insert.
pub struct FixedLookup(pub bool);

impl ReferenceLookup for FixedLookup {
    fn resolves(&mut self, _id: i64) -> Result<bool, PersistenceError> {
        Ok(self.0)
    }
}

/// Answers "exists" to the first lookup and asks the real table afterwards,
/// standing in for a row deleted right after the proactive check.
pub struct StaleOnceLookup {
    inner: Box<dyn ReferenceLookup>,
    checked: bool,
}

impl StaleOnceLookup {
    pub fn new(inner: impl ReferenceLookup + 'static) -> Box<Self> {
        Box::new(Self {
            inner: Box::new(inner),
            checked: false,
        })
    }
}

impl ReferenceLookup for StaleOnceLookup {
    fn resolves(&mut self, id: i64) -> Result<bool, PersistenceError> {
        if self.checked {
            return self.inner.resolves(id);
        }
        self.checked = true;
        Ok(true)
    }
}

/// A lookup whose backend is broken.
pub struct FailingLookup;

impl ReferenceLookup for FailingLookup {
    fn resolves(&mut self, _id: i64) -> Result<bool, PersistenceError> {
        Err(PersistenceError::DatabaseError(String::from(
            "lookup table unavailable",
        )))
    }
}

pub fn create_test_logger(db: &Database, clock: &Arc<ManualClock>) -> AuditLogger {
    AuditLogger::new(db).with_clock(Arc::clone(clock) as Arc<dyn Clock>)
}

pub fn create_test_principal(db: &Database, account: &str) -> i64 {
    Principals::new(db)
        .with_hash_cost(TEST_HASH_COST)
        .create(&NewPrincipal::new(format!("Name of {account}"), account, "secret"))
        .expect("Failed to create test principal")
}

pub fn create_test_product(db: &Database, part_number: &str) -> i64 {
    let product: NewProduct = NewProduct {
        brand: Some(String::from("Acme")),
        category: Some(String::from("Fasteners")),
        quantity: 10,
        price: 2.5,
        ..NewProduct::new(part_number)
    };
    Products::new(db)
        .create(&product)
        .expect("Failed to create test product")
}
