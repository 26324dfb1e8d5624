//! SQL dialects: identifier quoting and placeholder style.
//!
//! A dialect is immutable and shared read-only by every session of an
//! [`Engine`](crate::Engine). Only the identifiers the renderer introduces
//! (table names, projected columns) go through [`Dialect::quote`]; caller
//! fragments are inserted verbatim apart from placeholder rewriting.

use serde::Deserialize;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;

/// Syntactic rules of one SQL variant.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Short name used in logs (`postgres`, `mysql`, `sqlite`).
    fn name(&self) -> &'static str;

    /// Quote a single identifier part (no dots).
    fn quote(&self, ident: &str) -> String {
        let mut out = String::with_capacity(ident.len() + 2);
        self.write_quoted(ident, &mut out);
        out
    }

    /// Append a quoted identifier part to `out`.
    fn write_quoted(&self, ident: &str, out: &mut String);

    /// Placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        let mut out = String::new();
        self.write_placeholder(index, &mut out);
        out
    }

    /// Append the placeholder for the 1-based parameter `index` to `out`.
    fn write_placeholder(&self, index: usize, out: &mut String);

    /// Append ` LIMIT n` / ` OFFSET m`.
    fn write_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, out: &mut String) {
        if let Some(n) = limit {
            let _ = write!(out, " LIMIT {n}");
        }
        if let Some(n) = offset {
            let _ = write!(out, " OFFSET {n}");
        }
    }
}

fn write_with_quote_char(quote: char, ident: &str, out: &mut String) {
    out.push(quote);
    for ch in ident.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
}

/// PostgreSQL: `"ident"` and numbered `$1, $2, ...` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_quoted(&self, ident: &str, out: &mut String) {
        write_with_quote_char('"', ident, out);
    }

    fn write_placeholder(&self, index: usize, out: &mut String) {
        let _ = write!(out, "${index}");
    }
}

/// MySQL: `` `ident` `` and positional `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn write_quoted(&self, ident: &str, out: &mut String) {
        write_with_quote_char('`', ident, out);
    }

    fn write_placeholder(&self, _index: usize, out: &mut String) {
        out.push('?');
    }

    // MySQL has no OFFSET without LIMIT; the documented workaround is the max u64.
    fn write_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, out: &mut String) {
        match (limit, offset) {
            (None, Some(m)) => {
                let _ = write!(out, " LIMIT {} OFFSET {m}", u64::MAX);
            }
            (limit, offset) => {
                if let Some(n) = limit {
                    let _ = write!(out, " LIMIT {n}");
                }
                if let Some(m) = offset {
                    let _ = write!(out, " OFFSET {m}");
                }
            }
        }
    }
}

/// SQLite: `"ident"` and positional `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_quoted(&self, ident: &str, out: &mut String) {
        write_with_quote_char('"', ident, out);
    }

    fn write_placeholder(&self, _index: usize, out: &mut String) {
        out.push('?');
    }

    fn write_limit_offset(&self, limit: Option<u64>, offset: Option<u64>, out: &mut String) {
        match (limit, offset) {
            (None, Some(m)) => {
                let _ = write!(out, " LIMIT -1 OFFSET {m}");
            }
            (limit, offset) => {
                if let Some(n) = limit {
                    let _ = write!(out, " LIMIT {n}");
                }
                if let Some(m) = offset {
                    let _ = write!(out, " OFFSET {m}");
                }
            }
        }
    }
}

/// Dialect selector used by [`EngineConfig`](crate::EngineConfig).
///
/// Sessions execute through `tokio-postgres`, so `mysql` (alias `mariadb`) and
/// `sqlite` are render-only: their SQL is for other drivers, via
/// [`Session::render`](crate::Session::render) or the `render_*` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Postgres,
    #[serde(alias = "mariadb")]
    Mysql,
    Sqlite,
}

impl DialectKind {
    /// Instantiate the shared dialect.
    pub fn build(self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::Postgres => Arc::new(Postgres),
            DialectKind::Mysql => Arc::new(MySql),
            DialectKind::Sqlite => Arc::new(Sqlite),
        }
    }

    /// Whether statements rendered with this dialect cannot run on the
    /// `tokio-postgres` executors.
    pub fn is_render_only(self) -> bool {
        !matches!(self, DialectKind::Postgres)
    }
}
