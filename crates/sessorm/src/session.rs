//! Session: chainable query builder plus execution terminals.
//!
//! A session accumulates one statement through chain calls and runs it through
//! exactly one terminal. Every terminal takes the accumulated statement out of
//! the session before it returns its future, so the session is EMPTY again
//! whatever happens next: success, store failure, timeout, or the future being
//! dropped unpolled.
//!
//! ```ignore
//! let mut session = engine.session(&client);
//!
//! let has_pending = session
//!     .table("salary")
//!     .join("INNER", "check_list", "check_list.id = salary.lid")
//!     .join("LEFT", "empsetting", "empsetting.id = salary.eid")
//!     .where_("salary.lid = ?", (1_i64,))
//!     .select("check_list.id")
//!     .exist()
//!     .await?;
//!
//! // Fresh statement: nothing from the previous chain leaks in.
//! let any_user = session.table("users").exist().await?;
//! ```

use crate::client::GenericClient;
use crate::condition::{Condition, IntoCondition};
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::ident::TableRef;
use crate::join::{Join, JoinKind};
use crate::param::IntoParams;
use crate::render::{Rendered, render_count, render_exist, render_select};
use crate::row::FromRow;
use crate::schema::{Entity, filter_conditions};
use crate::statement::{RawSql, Statement, StatementState};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_postgres::Row;

/// A reusable query session bound to one engine and one store client.
///
/// Chain methods take `&mut self` and never fail; the first invalid input is
/// remembered and returned by the next terminal.
pub struct Session<'a, C> {
    engine: &'a Engine,
    client: &'a C,
    stmt: Statement,
}

impl<'a, C: GenericClient> Session<'a, C> {
    pub(crate) fn new(engine: &'a Engine, client: &'a C) -> Self {
        Self {
            engine,
            client,
            stmt: Statement::new(),
        }
    }

    // ==================== Chain ====================

    /// Set the target table: `"name"`, `"schema.name"`, `"name alias"` or `"name AS alias"`.
    ///
    /// Last write wins.
    pub fn table(&mut self, name: impl AsRef<str>) -> &mut Self {
        match TableRef::parse(name.as_ref()) {
            Ok(table) => self.stmt.table = Some(table),
            Err(e) => self.stmt.defer(e),
        }
        self
    }

    /// Target the table registered for `T`.
    pub fn table_of<T: 'static>(&mut self) -> &mut Self {
        let table = self
            .engine
            .registry()
            .resolve_type::<T>()
            .and_then(|schema| TableRef::parse(&schema.name));
        match table {
            Ok(table) => self.stmt.table = Some(table),
            Err(e) => self.stmt.defer(e),
        }
        self
    }

    /// Append a join. `kind` is `INNER`, `LEFT`, `RIGHT` or `FULL` (optionally
    /// with `OUTER`), case-insensitive. The predicate is inserted verbatim.
    pub fn join(
        &mut self,
        kind: impl AsRef<str>,
        table: impl AsRef<str>,
        predicate: impl Into<String>,
    ) -> &mut Self {
        self.join_with(kind, table, predicate, ())
    }

    /// Append a join whose predicate binds `?` parameters.
    pub fn join_with(
        &mut self,
        kind: impl AsRef<str>,
        table: impl AsRef<str>,
        predicate: impl Into<String>,
        params: impl IntoParams,
    ) -> &mut Self {
        let join = kind
            .as_ref()
            .parse::<JoinKind>()
            .and_then(|kind| Ok((kind, TableRef::parse(table.as_ref())?)));
        match join {
            Ok((kind, table)) => self
                .stmt
                .joins
                .push(Join::new(kind, table, predicate).with_params(params)),
            Err(e) => self.stmt.defer(e),
        }
        self
    }

    /// Append a filter fragment with `?` placeholders. Multiple calls are AND-combined.
    pub fn where_(&mut self, fragment: impl Into<String>, params: impl IntoParams) -> &mut Self {
        self.stmt.conditions.push(Condition::raw(fragment, params));
        self
    }

    /// Alias of [`where_`](Self::where_) that reads better mid-chain.
    pub fn and(&mut self, fragment: impl Into<String>, params: impl IntoParams) -> &mut Self {
        self.where_(fragment, params)
    }

    /// Append a structured condition.
    ///
    /// ```ignore
    /// session.table("users").filter(Condition::eq("status", "active")).exist().await?;
    /// ```
    pub fn filter(&mut self, condition: impl IntoCondition) -> &mut Self {
        match condition.into_condition() {
            Ok(cond) => self.stmt.conditions.push(cond),
            Err(e) => self.stmt.defer(e),
        }
        self
    }

    /// Replace the projection. Accepts `"a, b.c"` or a list of columns.
    pub fn select(&mut self, columns: impl IntoColumns) -> &mut Self {
        self.stmt.columns = columns.into_columns();
        self
    }

    /// Run this SQL instead of the builder statement. `?` placeholders are
    /// rewritten for the dialect; nothing else is touched.
    ///
    /// While raw SQL is set, table, joins, conditions, projection, ordering and
    /// paging are ignored. [`exist`](Self::exist) runs it as written and reports
    /// whether any row came back; [`count`](Self::count) wraps it as a derived
    /// table.
    pub fn sql(&mut self, sql: impl Into<String>, params: impl IntoParams) -> &mut Self {
        self.stmt.raw = Some(RawSql {
            sql: sql.into(),
            params: params.into_params(),
        });
        self
    }

    /// Append an `ORDER BY` expression (verbatim).
    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.stmt.order_by.push(expr.into());
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.stmt.limit = Some(n);
        self
    }

    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.stmt.offset = Some(n);
        self
    }

    /// Deadline for the next terminal. Overrides the engine's default.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.stmt.timeout = Some(timeout);
        self
    }

    /// Discard everything accumulated so far.
    pub fn reset(&mut self) -> &mut Self {
        self.stmt.reset();
        self
    }

    pub fn state(&self) -> StatementState {
        self.stmt.state()
    }

    /// The statement accumulated so far.
    pub fn statement(&self) -> &Statement {
        &self.stmt
    }

    // ==================== Terminals ====================

    /// Whether the statement matches at least one row.
    pub fn exist(&mut self) -> impl Future<Output = OrmResult<bool>> + Send + use<'a, C> {
        let stmt = self.take_statement();
        let (engine, client) = (self.engine, self.client);
        async move {
            let timeout = stmt.timeout;
            let rendered = render_exist(stmt, engine.dialect())?;
            let rows = run(engine, client, "exist", &rendered, timeout).await?;
            Ok(!rows.is_empty())
        }
    }

    /// Whether a row matches every non-default field of `filter`, on top of the
    /// conditions already chained.
    ///
    /// Uses the filter's registered table unless one was set explicitly. Fails
    /// with [`OrmError::InvalidArgument`] when raw SQL is set.
    pub fn exist_by<T: Entity>(
        &mut self,
        filter: &T,
    ) -> impl Future<Output = OrmResult<bool>> + Send + use<'a, C, T> {
        let mut stmt = self.take_statement();
        if let Err(e) = apply_filter(self.engine, &mut stmt, filter) {
            stmt.defer(e);
        }
        let (engine, client) = (self.engine, self.client);
        async move {
            let timeout = stmt.timeout;
            let rendered = render_exist(stmt, engine.dialect())?;
            let rows = run(engine, client, "exist_by", &rendered, timeout).await?;
            Ok(!rows.is_empty())
        }
    }

    /// Number of rows the statement matches.
    pub fn count(&mut self) -> impl Future<Output = OrmResult<i64>> + Send + use<'a, C> {
        let stmt = self.take_statement();
        let (engine, client) = (self.engine, self.client);
        async move {
            let timeout = stmt.timeout;
            let rendered = render_count(stmt, engine.dialect())?;
            let rows = run(engine, client, "count", &rendered, timeout).await?;
            let row = rows
                .first()
                .ok_or_else(|| OrmError::not_found("COUNT returned no row"))?;
            row.try_get::<usize, i64>(0)
                .map_err(|e| OrmError::decode("count", e.to_string()))
        }
    }

    /// All matching rows, mapped through [`FromRow`].
    pub fn find<T: FromRow>(&mut self) -> impl Future<Output = OrmResult<Vec<T>>> + Send + use<'a, C, T> {
        let stmt = self.take_statement();
        let (engine, client) = (self.engine, self.client);
        async move {
            let timeout = stmt.timeout;
            let rendered = render_select(stmt, engine.dialect())?;
            let rows = run(engine, client, "find", &rendered, timeout).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// The first matching row, if any. Builder statements are limited to one row.
    pub fn get<T: FromRow>(&mut self) -> impl Future<Output = OrmResult<Option<T>>> + Send + use<'a, C, T> {
        let mut stmt = self.take_statement();
        stmt.limit = Some(1);
        let (engine, client) = (self.engine, self.client);
        async move {
            let timeout = stmt.timeout;
            let rendered = render_select(stmt, engine.dialect())?;
            let rows = run(engine, client, "get", &rendered, timeout).await?;
            rows.first().map(T::from_row).transpose()
        }
    }

    /// Compile the accumulated statement without executing it. Resets the session.
    pub fn render(&mut self) -> OrmResult<Rendered> {
        let stmt = self.take_statement();
        render_select(stmt, self.engine.dialect())
    }

    fn take_statement(&mut self) -> Statement {
        let stmt = self.stmt.take();
        #[cfg(feature = "tracing")]
        if stmt.raw.is_some() && stmt.has_builder_state() {
            tracing::debug!(
                target: "sessorm.sql",
                "raw SQL set; ignoring table, joins, conditions and projection"
            );
        }
        stmt
    }
}

impl<C> std::fmt::Debug for Session<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.engine.dialect().name())
            .field("stmt", &self.stmt)
            .finish()
    }
}

fn apply_filter<T: Entity>(engine: &Engine, stmt: &mut Statement, filter: &T) -> OrmResult<()> {
    if stmt.deferred_error().is_some() {
        return Ok(());
    }
    if stmt.raw.is_some() {
        return Err(OrmError::invalid(
            "exist_by cannot be combined with raw SQL; use where_ or exist",
        ));
    }
    let schema = engine.registry().resolve_type::<T>()?;
    if stmt.table.is_none() {
        stmt.table = Some(TableRef::parse(&schema.name)?);
    }
    let conditions = filter_conditions(schema, filter.field_values())?;
    stmt.conditions.extend(conditions);
    Ok(())
}

/// Run a rendered statement with the effective timeout and log it.
async fn run<C: GenericClient>(
    engine: &Engine,
    client: &C,
    op: &'static str,
    rendered: &Rendered,
    timeout: Option<Duration>,
) -> OrmResult<Vec<Row>> {
    let timeout = timeout.or(engine.config().query_timeout);
    let params = rendered.params_ref();
    let start = Instant::now();
    let result = execute_with_timeout(client, timeout, client.query(&rendered.sql, &params)).await;
    log_statement(engine, op, rendered, start.elapsed(), &result);
    result
}

async fn execute_with_timeout<C, T, F>(client: &C, timeout: Option<Duration>, future: F) -> OrmResult<T>
where
    C: GenericClient,
    F: Future<Output = OrmResult<T>> + Send,
{
    match timeout {
        Some(timeout) => match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                if let Some(cancel_token) = client.cancel_token() {
                    tokio::spawn(async move {
                        let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                    });
                }
                Err(OrmError::Timeout(timeout))
            }
        },
        None => future.await,
    }
}

#[cfg(feature = "tracing")]
fn log_statement(
    engine: &Engine,
    op: &'static str,
    rendered: &Rendered,
    elapsed: Duration,
    result: &OrmResult<Vec<Row>>,
) {
    let config = engine.config();
    let sql = truncate_sql_bytes(&rendered.sql, config.max_logged_sql_len);
    let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    let rows = result.as_ref().map(Vec::len).ok();

    tracing::debug!(
        target: "sessorm.sql",
        op,
        dialect = engine.dialect().name(),
        param_count = rendered.params.len(),
        elapsed_us,
        rows,
        ok = result.is_ok(),
        sql = %sql,
    );

    if let Some(threshold) = config.slow_query_threshold
        && elapsed > threshold
    {
        tracing::warn!(
            target: "sessorm.sql",
            op,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX),
            sql = %sql,
            "slow query"
        );
    }
}

#[cfg(not(feature = "tracing"))]
fn log_statement(_: &Engine, _: &'static str, _: &Rendered, _: Duration, _: &OrmResult<Vec<Row>>) {}

#[cfg(feature = "tracing")]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Conversion into a projection list.
///
/// A string is split on top-level commas, so `"id, coalesce(a, b)"` is two columns.
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        split_columns(self)
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        split_columns(&self)
    }
}

impl<S: Into<String>> IntoColumns for Vec<S> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

fn split_columns(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                out.push(s[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim().to_string());
    out.retain(|c| !c.is_empty());
    out
}
