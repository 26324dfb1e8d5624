//! # sessorm
//!
//! A session-based struct-relational query engine over `tokio-postgres`.
//!
//! ## Features
//!
//! - **Chainable sessions**: `table` / `join` / `where_` / `select` / `sql` accumulate one statement
//! - **One statement per terminal**: `exist`, `exist_by`, `count`, `find`, `get` run it and reset the session
//! - **Dialect-aware rendering**: Postgres, MySQL and SQLite quoting and placeholders
//! - **Type-driven schemas**: `#[derive(Entity)]` maps a struct to its table, `#[derive(FromRow)]` maps rows back
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use sessorm::{Engine, Entity, FromRow};
//!
//! #[derive(Default, Entity, FromRow)]
//! #[orm(table = "record")]
//! struct Record {
//!     #[orm(id)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let engine = Engine::builder().register::<Record>().build();
//! let mut session = engine.session(&client);
//!
//! let exists = session.exist_by(&Record { name: "x".into(), ..Default::default() }).await?;
//!
//! let recent: Vec<Record> = session
//!     .table_of::<Record>()
//!     .where_("id > ?", (100_i64,))
//!     .order_by("id DESC")
//!     .limit(10)
//!     .find()
//!     .await?;
//! ```
//!
//! ## Fragments are trusted
//!
//! Condition fragments, join predicates, ordering expressions and raw SQL are
//! inserted verbatim apart from `?` placeholder rewriting. Bind every value as a
//! parameter; never format user input into a fragment.
//!
//! ## Dialects
//!
//! Every executor is a `tokio-postgres` client, so only [`Postgres`] can run
//! statements. [`MySql`] and [`Sqlite`] are render-only: use them with
//! [`Session::render`] or the `render_*` functions to produce SQL for another
//! driver. Terminals that execute on an engine with either of them will send
//! `?` placeholders (and, for MySQL, backtick quoting) to Postgres, which
//! rejects them.

pub mod client;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod ident;
pub mod join;
pub mod param;
pub mod render;
pub mod row;
pub mod schema;
pub mod session;
pub mod statement;

pub use client::GenericClient;
pub use condition::{Condition, IntoCondition, Op};
pub use config::{EngineConfig, PoolConfig, Recycling};
pub use dialect::{Dialect, DialectKind, MySql, Postgres, Sqlite};
pub use engine::{Engine, EngineBuilder};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, IntoIdent, TableRef};
pub use join::{Join, JoinKind};
pub use param::{IntoParams, Param};
pub use render::{Rendered, render_count, render_exist, render_select};
pub use row::{FromRow, RowExt};
pub use schema::{ColumnMeta, Entity, FieldValue, SchemaRegistry, TableSchema, filter_conditions, is_zero};
pub use session::{IntoColumns, Session};
pub use statement::{RawSql, Statement, StatementState};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_from_config, create_pool_with_tls};

// Re-export derive macros
#[cfg(feature = "derive")]
pub use sessorm_derive::{Entity, FromRow};

// Re-export tokio_postgres for convenience
pub use tokio_postgres;
