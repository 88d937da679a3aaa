// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Time source for audit timestamps.
//!
//! Timestamps are stored as fixed-width `YYYY-MM-DD HH:MM:SS` text (UTC,
//! second precision) on both backends, so lexical comparison in SQL matches
//! chronological order.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::PersistenceError;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Supplies the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time, truncated to whole seconds.
    fn now(&self) -> PrimitiveDateTime;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now: OffsetDateTime = OffsetDateTime::now_utc();
        let now: OffsetDateTime = now.replace_nanosecond(0).unwrap_or(now);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Renders a timestamp in storage form.
///
/// # Errors
///
/// Returns an error if the timestamp cannot be formatted.
pub fn format_timestamp(timestamp: PrimitiveDateTime) -> Result<String, PersistenceError> {
    timestamp
        .format(TIMESTAMP_FORMAT)
        .map_err(|e| PersistenceError::SerializationError(format!("timestamp: {e}")))
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns an error if the text is not in storage form.
pub fn parse_timestamp(text: &str) -> Result<PrimitiveDateTime, PersistenceError> {
    PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT)
        .map_err(|e| PersistenceError::ReconstructionError(format!("timestamp '{text}': {e}")))
}
