// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};

/// The closed set of error classes callers branch on.
///
/// Backend-specific error shapes are translated into this taxonomy once, when
/// a Diesel error is converted into a [`PersistenceError`]. Retry and audit
/// logic only ever inspect the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The live connection handle is no longer usable.
    Connectivity,
    /// A referenced row does not exist.
    ForeignKeyViolation,
    /// A unique or primary key constraint was violated.
    DuplicateKey,
    /// The requested row does not exist.
    NotFound,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &str = match self {
            Self::Connectivity => "connectivity",
            Self::ForeignKeyViolation => "foreign_key_violation",
            Self::DuplicateKey => "duplicate_key",
            Self::NotFound => "not_found",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during persistence operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Establishing a connection failed.
    DatabaseConnectionFailed(String),
    /// An established connection was lost mid-operation.
    ConnectionLost(String),
    /// A referenced row is missing.
    ForeignKeyViolation {
        /// The referencing column, when the backend reports it.
        column: Option<String>,
        message: String,
    },
    /// A unique constraint was violated.
    DuplicateKey(String),
    /// The requested resource was not found.
    NotFound(String),
    /// An unclassified database error.
    DatabaseError(String),
    /// Database migration failed.
    MigrationFailed(String),
    /// Initialization error.
    InitializationError(String),
    /// Foreign key enforcement is not enabled.
    ForeignKeyEnforcementNotEnabled,
    /// A statement could not be rendered.
    InvalidStatement(String),
    /// Serialization/deserialization error.
    SerializationError(String),
    /// A stored row could not be turned back into a domain value.
    ReconstructionError(String),
    /// Other errors.
    Other(String),
}

impl PersistenceError {
    /// Returns the stable discriminator for this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DatabaseConnectionFailed(_) | Self::ConnectionLost(_) => ErrorClass::Connectivity,
            Self::ForeignKeyViolation { .. } => ErrorClass::ForeignKeyViolation,
            Self::DuplicateKey(_) => ErrorClass::DuplicateKey,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::DatabaseError(_)
            | Self::MigrationFailed(_)
            | Self::InitializationError(_)
            | Self::ForeignKeyEnforcementNotEnabled
            | Self::InvalidStatement(_)
            | Self::SerializationError(_)
            | Self::ReconstructionError(_)
            | Self::Other(_) => ErrorClass::Other,
        }
    }

    /// Returns true if the connection handle that produced this error should be discarded.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self.class(), ErrorClass::Connectivity)
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseConnectionFailed(msg) => {
                write!(f, "Database connection failed: {msg}")
            }
            Self::ConnectionLost(msg) => write!(f, "Database connection lost: {msg}"),
            Self::ForeignKeyViolation {
                column: Some(column),
                message,
            } => write!(f, "Foreign key violation on {column}: {message}"),
            Self::ForeignKeyViolation {
                column: None,
                message,
            } => write!(f, "Foreign key violation: {message}"),
            Self::DuplicateKey(msg) => write!(f, "Duplicate key: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::MigrationFailed(msg) => write!(f, "Migration failed: {msg}"),
            Self::InitializationError(msg) => write!(f, "Initialization error: {msg}"),
            Self::ForeignKeyEnforcementNotEnabled => {
                write!(f, "Foreign key enforcement is not enabled")
            }
            Self::InvalidStatement(msg) => write!(f, "Invalid statement: {msg}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::ReconstructionError(msg) => write!(f, "Reconstruction error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// `MySQL` client messages for a dropped server connection (2006, 2013).
const CONNECTION_LOST_MESSAGES: [&str; 2] = ["server has gone away", "Lost connection"];

impl From<diesel::result::Error> for PersistenceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(kind, info) => classify(kind, info.as_ref()),
            diesel::result::Error::BrokenTransactionManager => {
                Self::ConnectionLost(err.to_string())
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

fn classify(kind: DatabaseErrorKind, info: &(dyn DatabaseErrorInformation + Send + Sync)) -> PersistenceError {
    let message: String = info.message().to_string();
    match kind {
        DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
            PersistenceError::ConnectionLost(message)
        }
        DatabaseErrorKind::ForeignKeyViolation => PersistenceError::ForeignKeyViolation {
            column: foreign_key_column(info),
            message,
        },
        DatabaseErrorKind::UniqueViolation => PersistenceError::DuplicateKey(message),
        _ if CONNECTION_LOST_MESSAGES
            .iter()
            .any(|needle| message.contains(needle)) =>
        {
            PersistenceError::ConnectionLost(message)
        }
        _ => PersistenceError::DatabaseError(message),
    }
}

/// Extracts the referencing column of a foreign key failure.
///
/// `MySQL` only reports it inside the message text
/// (``... FOREIGN KEY (`target_user`) REFERENCES ...``); `SQLite` does not
/// report it at all.
fn foreign_key_column(info: &(dyn DatabaseErrorInformation + Send + Sync)) -> Option<String> {
    if let Some(column) = info.column_name() {
        return Some(column.to_string());
    }
    parse_foreign_key_column(info.message())
}

pub(crate) fn parse_foreign_key_column(message: &str) -> Option<String> {
    const MARKER: &str = "FOREIGN KEY (";
    let start: usize = message.find(MARKER)? + MARKER.len();
    let rest: &str = &message[start..];
    let end: usize = rest.find(')')?;
    let column: &str = rest[..end].trim().trim_matches('`');
    if column.is_empty() {
        None
    } else {
        Some(column.to_string())
    }
}

impl From<diesel::ConnectionError> for PersistenceError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::DatabaseConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
