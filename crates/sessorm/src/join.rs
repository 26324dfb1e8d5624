//! Join clauses.

use crate::condition::bind_fragment;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::TableRef;
use crate::param::{IntoParams, Param};
use std::fmt;
use std::str::FromStr;

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for JoinKind {
    type Err = OrmError;

    /// Accepts `INNER`, `LEFT`, `RIGHT`, `FULL`, each optionally followed by
    /// `OUTER` and/or `JOIN`, in any case.
    fn from_str(s: &str) -> OrmResult<Self> {
        let mut words = s.split_whitespace().map(str::to_ascii_uppercase);
        let kind = match words.next().as_deref() {
            Some("INNER") => JoinKind::Inner,
            Some("LEFT") => JoinKind::Left,
            Some("RIGHT") => JoinKind::Right,
            Some("FULL") => JoinKind::Full,
            _ => return Err(OrmError::invalid(format!("Unknown join kind '{s}'"))),
        };

        let mut rest: Vec<String> = words.collect();
        if rest.last().map(String::as_str) == Some("JOIN") {
            rest.pop();
        }
        match rest.as_slice() {
            [] => Ok(kind),
            [outer] if outer == "OUTER" && kind != JoinKind::Inner => Ok(kind),
            _ => Err(OrmError::invalid(format!("Unknown join kind '{s}'"))),
        }
    }
}

/// A join clause: `<KIND> JOIN <table> ON <predicate>`.
///
/// The predicate is a caller fragment and is inserted verbatim.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub predicate: String,
    params: Vec<Param>,
}

impl Join {
    pub fn new(kind: JoinKind, table: TableRef, predicate: impl Into<String>) -> Self {
        Self {
            kind,
            table,
            predicate: predicate.into(),
            params: Vec::new(),
        }
    }

    /// Bind parameters for `?` placeholders in the predicate.
    pub fn with_params(mut self, params: impl IntoParams) -> Self {
        self.params = params.into_params();
        self
    }

    pub(crate) fn write_sql(
        &self,
        dialect: &dyn Dialect,
        out: &mut String,
        params: &mut Vec<Param>,
    ) -> OrmResult<()> {
        out.push(' ');
        out.push_str(self.kind.as_sql());
        out.push(' ');
        self.table.write_sql(dialect, out);
        out.push_str(" ON ");
        bind_fragment(&self.predicate, &self.params, dialect, out, params)
    }
}
