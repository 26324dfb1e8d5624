//! Statement context: the mutable accumulator behind a session.
//!
//! A [`Statement`] starts EMPTY, is mutated by chain calls and is consumed
//! whole by one terminal. Chain calls never fail: the first error they hit is
//! recorded and surfaced by the terminal that renders the statement.

use crate::condition::Condition;
use crate::error::OrmError;
use crate::ident::TableRef;
use crate::join::Join;
use crate::param::Param;
use std::time::Duration;

/// Raw SQL override with its positional parameters.
#[derive(Debug, Clone)]
pub struct RawSql {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Lifecycle state of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Nothing recorded since creation or the last reset.
    Empty,
    /// At least one chain call has been recorded.
    Accumulating,
}

/// Accumulated query description.
#[derive(Debug, Default)]
pub struct Statement {
    pub table: Option<TableRef>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub columns: Vec<String>,
    pub raw: Option<RawSql>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub timeout: Option<Duration>,
    pub(crate) deferred_error: Option<OrmError>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StatementState {
        let empty = self.table.is_none()
            && self.joins.is_empty()
            && self.conditions.is_empty()
            && self.columns.is_empty()
            && self.raw.is_none()
            && self.order_by.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.timeout.is_none()
            && self.deferred_error.is_none();
        if empty {
            StatementState::Empty
        } else {
            StatementState::Accumulating
        }
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the accumulated statement out, leaving this one EMPTY.
    pub fn take(&mut self) -> Statement {
        std::mem::take(self)
    }

    /// Record a chain-time error. The first one wins.
    pub(crate) fn defer(&mut self, err: OrmError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(err);
        }
    }

    pub fn deferred_error(&self) -> Option<&OrmError> {
        self.deferred_error.as_ref()
    }

    pub(crate) fn take_deferred_error(&mut self) -> Option<OrmError> {
        self.deferred_error.take()
    }

    /// Whether builder-path fields are set alongside a raw override.
    #[cfg(feature = "tracing")]
    pub(crate) fn has_builder_state(&self) -> bool {
        self.table.is_some()
            || !self.joins.is_empty()
            || !self.conditions.is_empty()
            || !self.columns.is_empty()
            || !self.order_by.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
    }
}
