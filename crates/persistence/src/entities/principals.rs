// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::info;

use crate::accessor::EntityAccessor;
use crate::data_models::PrincipalRow;
use crate::database::Database;
use crate::error::PersistenceError;
use crate::query::{Condition, Direction, Query};
use crate::value::Record;

const USERS_TABLE: &str = "users";

/// Input for creating a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub name: String,
    pub account: String,
    pub email: Option<String>,
    /// Plain-text password; hashed before it is stored.
    pub password: String,
    pub role: String,
    pub status: i64,
}

impl NewPrincipal {
    /// An active principal with the `user` role and no email.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            email: None,
            password: password.into(),
            role: "user".to_string(),
            status: 1,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// Accessor for the `users` table.
#[derive(Debug)]
pub struct Principals {
    accessor: EntityAccessor,
    hash_cost: u32,
}

impl Principals {
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            accessor: EntityAccessor::new(database, USERS_TABLE),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt cost used for new password hashes.
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Creates a principal and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::DuplicateKey`] if the account name is taken,
    /// or another error if hashing or the insert fails.
    pub fn create(&mut self, principal: &NewPrincipal) -> Result<i64, PersistenceError> {
        let password_hash: String = bcrypt::hash(&principal.password, self.hash_cost)
            .map_err(|e| PersistenceError::Other(format!("Failed to hash password: {e}")))?;

        let record: Record = Record::new()
            .set("name", &principal.name)
            .set("account", &principal.account)
            .set("email", principal.email.as_deref())
            .set("password_hash", password_hash)
            .set("role", &principal.role)
            .set("status", principal.status);
        let user_id: i64 = self.accessor.insert(&record)?;

        info!(user_id, account = %principal.account, "Principal created");
        Ok(user_id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_by_id(&mut self, id: i64) -> Result<Option<PrincipalRow>, PersistenceError> {
        self.accessor.find_by_id(id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_by_account(&mut self, account: &str) -> Result<Option<PrincipalRow>, PersistenceError> {
        self.accessor
            .first(Query::new().filter(vec![Condition::new("account", account)]))
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn exists(&mut self, id: i64) -> Result<bool, PersistenceError> {
        self.accessor.exists(id)
    }

    /// Checks a plain-text password against the stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is malformed.
    pub fn verify_password(principal: &PrincipalRow, password: &str) -> Result<bool, PersistenceError> {
        bcrypt::verify(password, &principal.password_hash)
            .map_err(|e| PersistenceError::Other(format!("Failed to verify password: {e}")))
    }

    /// Applies `changes` to one principal and returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns an error if `changes` is empty or the update fails.
    pub fn update(&mut self, id: i64, changes: &Record) -> Result<usize, PersistenceError> {
        self.accessor
            .update(Query::new().filter(vec![Condition::new("id", id)]), changes)
    }

    /// Deletes one principal. Audit records referencing it keep their rows;
    /// the schema nulls their `target_user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete(&mut self, id: i64) -> Result<usize, PersistenceError> {
        let removed: usize = self
            .accessor
            .delete(Query::new().filter(vec![Condition::new("id", id)]))?;
        info!(user_id = id, removed, "Principal deleted");
        Ok(removed)
    }

    /// Every principal, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&mut self) -> Result<Vec<PrincipalRow>, PersistenceError> {
        self.accessor
            .get(Query::new().order_by([("name", Direction::Asc), ("id", Direction::Asc)]))
    }
}
