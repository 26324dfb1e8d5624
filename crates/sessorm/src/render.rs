//! SQL renderer: compiles a [`Statement`] against a [`Dialect`].
//!
//! Rendering consumes the statement. It is pure: no I/O, no logging, and the
//! same statement always renders to the same text and parameter order.
//!
//! Builder statements render as
//!
//! ```text
//! SELECT <projection|*> FROM <table> [<KIND> JOIN <table> ON <predicate>]...
//!     [WHERE <c1> AND <c2>...] [ORDER BY ...] [LIMIT n] [OFFSET m]
//! ```
//!
//! A raw override takes precedence over every builder field and is sent as
//! written, with only `?` placeholders rewritten. Existence checks run it
//! unchanged; counts wrap it as a derived table.

use crate::condition::{Condition, bind_fragment};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::param::Param;
use crate::statement::{RawSql, Statement};
use tokio_postgres::types::ToSql;

/// A compiled statement: SQL text plus parameters in binding order.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Rendered {
    /// Borrow the parameters in the shape `tokio-postgres` expects.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Param::as_ref).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Select,
    Exist,
    Count,
}

/// Render a row-returning query.
pub fn render_select(stmt: Statement, dialect: &dyn Dialect) -> OrmResult<Rendered> {
    render(stmt, dialect, Shape::Select)
}

/// Render an existence check: at most one row, non-empty result means "exists".
pub fn render_exist(stmt: Statement, dialect: &dyn Dialect) -> OrmResult<Rendered> {
    render(stmt, dialect, Shape::Exist)
}

/// Render `SELECT COUNT(*)` over the statement's table, joins and conditions.
pub fn render_count(stmt: Statement, dialect: &dyn Dialect) -> OrmResult<Rendered> {
    render(stmt, dialect, Shape::Count)
}

fn render(mut stmt: Statement, dialect: &dyn Dialect, shape: Shape) -> OrmResult<Rendered> {
    if let Some(err) = stmt.take_deferred_error() {
        return Err(err);
    }
    if let Some(raw) = stmt.raw.take() {
        return render_raw(raw, dialect, shape);
    }

    let Some(table) = stmt.table.as_ref() else {
        return Err(OrmError::IncompleteStatement(
            "no table and no raw SQL set".to_string(),
        ));
    };

    let mut sql = String::with_capacity(128);
    let mut params = Vec::new();

    sql.push_str("SELECT ");
    if shape == Shape::Count {
        sql.push_str("COUNT(*)");
    } else {
        write_projection(&stmt.columns, dialect, &mut sql);
    }
    sql.push_str(" FROM ");
    table.write_sql(dialect, &mut sql);

    for join in &stmt.joins {
        join.write_sql(dialect, &mut sql, &mut params)?;
    }

    if let Some(cond) = Condition::all(stmt.conditions) {
        sql.push_str(" WHERE ");
        cond.write_sql(dialect, &mut sql, &mut params)?;
    }

    if shape == Shape::Count {
        return Ok(Rendered { sql, params });
    }

    if !stmt.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&stmt.order_by.join(", "));
    }

    let limit = match shape {
        Shape::Exist => Some(stmt.limit.map_or(1, |n| n.min(1))),
        _ => stmt.limit,
    };
    dialect.write_limit_offset(limit, stmt.offset, &mut sql);

    Ok(Rendered { sql, params })
}

fn render_raw(raw: RawSql, dialect: &dyn Dialect, shape: Shape) -> OrmResult<Rendered> {
    let mut sql = String::with_capacity(raw.sql.len());
    let mut params = Vec::with_capacity(raw.params.len());

    match shape {
        Shape::Select | Shape::Exist => {
            bind_fragment(&raw.sql, &raw.params, dialect, &mut sql, &mut params)?;
        }
        Shape::Count => {
            // A trailing `--` comment in the raw text must not swallow the paren.
            let body = raw.sql.trim_end().trim_end_matches(';');
            sql.push_str("SELECT COUNT(*) FROM (");
            bind_fragment(body, &raw.params, dialect, &mut sql, &mut params)?;
            sql.push_str("\n) AS count_rows");
        }
    }

    Ok(Rendered { sql, params })
}

/// Identifiers (`col`, `t.col`, `t.*`) are quoted per part; anything else is an
/// expression and goes in verbatim.
fn write_projection(columns: &[String], dialect: &dyn Dialect, out: &mut String) {
    if columns.is_empty() {
        out.push('*');
        return;
    }
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let col = col.trim();
        if let Some(prefix) = col.strip_suffix(".*")
            && let Ok(ident) = Ident::parse(prefix)
        {
            ident.write_sql(dialect, out);
            out.push_str(".*");
        } else if let Ok(ident) = Ident::parse(col) {
            ident.write_sql(dialect, out);
        } else {
            out.push_str(col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres, Sqlite};
    use crate::ident::TableRef;
    use crate::join::{Join, JoinKind};
    use crate::param::IntoParams;

    fn with_table(name: &str) -> Statement {
        let mut stmt = Statement::new();
        stmt.table = Some(TableRef::parse(name).unwrap());
        stmt
    }

    fn salary_join() -> Statement {
        let mut stmt = with_table("salary");
        stmt.joins.push(Join::new(
            JoinKind::Inner,
            TableRef::parse("check_list").unwrap(),
            "check_list.id = salary.lid",
        ));
        stmt.joins.push(Join::new(
            JoinKind::Left,
            TableRef::parse("empsetting").unwrap(),
            "empsetting.id = salary.eid",
        ));
        stmt.conditions.push(Condition::raw("salary.lid = ?", (1_i64,)));
        stmt.columns = vec!["check_list.id".to_string()];
        stmt
    }

    #[test]
    fn bare_table_selects_star() {
        let r = render_select(with_table("record"), &Postgres).unwrap();
        assert_eq!(r.sql, r#"SELECT * FROM "record""#);
        assert!(r.params.is_empty());
    }

    #[test]
    fn joins_render_in_append_order() {
        let r = render_exist(salary_join(), &Postgres).unwrap();
        assert_eq!(
            r.sql,
            r#"SELECT "check_list"."id" FROM "salary" INNER JOIN "check_list" ON check_list.id = salary.lid LEFT JOIN "empsetting" ON empsetting.id = salary.eid WHERE salary.lid = $1 LIMIT 1"#
        );
        assert_eq!(r.params.len(), 1);
    }

    #[test]
    fn same_statement_per_dialect() {
        let my = render_exist(salary_join(), &MySql).unwrap();
        assert_eq!(
            my.sql,
            "SELECT `check_list`.`id` FROM `salary` INNER JOIN `check_list` ON check_list.id = salary.lid LEFT JOIN `empsetting` ON empsetting.id = salary.eid WHERE salary.lid = ? LIMIT 1"
        );
        let lite = render_exist(salary_join(), &Sqlite).unwrap();
        assert!(lite.sql.starts_with(r#"SELECT "check_list"."id" FROM "salary""#));
        assert!(lite.sql.ends_with("WHERE salary.lid = ? LIMIT 1"));
    }

    #[test]
    fn conditions_are_and_combined_with_params_in_order() {
        let mut stmt = with_table("record");
        stmt.conditions.push(Condition::raw("name = ?", ("x",)));
        stmt.conditions.push(Condition::raw("age > ? OR age < ?", (1_i32, 99_i32)));
        let r = render_select(stmt, &Postgres).unwrap();
        assert_eq!(
            r.sql,
            r#"SELECT * FROM "record" WHERE (name = $1) AND (age > $2 OR age < $3)"#
        );
        assert_eq!(r.params.len(), 3);
        assert_eq!(r.params_ref().len(), 3);
    }

    #[test]
    fn join_params_bind_before_where_params() {
        let mut stmt = with_table("a");
        stmt.conditions.push(Condition::raw("a.x = ?", (2_i32,)));
        stmt.joins.push(
            Join::new(JoinKind::Inner, TableRef::parse("b").unwrap(), "b.a_id = a.id AND b.k = ?")
                .with_params((1_i32,)),
        );
        let r = render_select(stmt, &Postgres).unwrap();
        assert!(r.sql.contains("b.k = $1"));
        assert!(r.sql.ends_with("WHERE a.x = $2"));
    }

    #[test]
    fn projection_quotes_identifiers_only() {
        let mut stmt = with_table("t");
        stmt.columns = vec![
            "id".into(),
            "t.*".into(),
            "COUNT(*) AS n".into(),
            "lower(name)".into(),
        ];
        let r = render_select(stmt, &Postgres).unwrap();
        assert_eq!(
            r.sql,
            r#"SELECT "id", "t".*, COUNT(*) AS n, lower(name) FROM "t""#
        );
    }

    #[test]
    fn order_limit_offset() {
        let mut stmt = with_table("t");
        stmt.order_by.push("id DESC".into());
        stmt.limit = Some(10);
        stmt.offset = Some(20);
        let r = render_select(stmt, &Postgres).unwrap();
        assert_eq!(r.sql, r#"SELECT * FROM "t" ORDER BY id DESC LIMIT 10 OFFSET 20"#);
    }

    #[test]
    fn exist_forces_limit_one() {
        let mut stmt = with_table("t");
        stmt.limit = Some(50);
        let r = render_exist(stmt, &Postgres).unwrap();
        assert_eq!(r.sql, r#"SELECT * FROM "t" LIMIT 1"#);
    }

    #[test]
    fn count_drops_order_and_limit() {
        let mut stmt = with_table("t");
        stmt.conditions.push(Condition::raw("x = ?", (1_i32,)));
        stmt.order_by.push("id".into());
        stmt.limit = Some(3);
        let r = render_count(stmt, &Postgres).unwrap();
        assert_eq!(r.sql, r#"SELECT COUNT(*) FROM "t" WHERE x = $1"#);
    }

    #[test]
    fn missing_table_is_incomplete() {
        let err = render_exist(Statement::new(), &Postgres).unwrap_err();
        assert!(matches!(err, OrmError::IncompleteStatement(_)));
    }

    #[test]
    fn deferred_error_is_returned_first() {
        let mut stmt = with_table("t");
        stmt.defer(OrmError::UnknownType("Ghost"));
        stmt.raw = Some(RawSql {
            sql: "SELECT 1".into(),
            params: Vec::new(),
        });
        assert!(matches!(
            render_exist(stmt, &Postgres),
            Err(OrmError::UnknownType("Ghost"))
        ));
    }

    #[test]
    fn param_mismatch_surfaces_at_render() {
        let mut stmt = with_table("t");
        stmt.conditions.push(Condition::raw("a = ? AND b = ?", (1_i32,)));
        match render_exist(stmt, &Postgres) {
            Err(OrmError::ParamMismatch {
                fragment,
                placeholders,
                params,
            }) => {
                assert_eq!(fragment, "a = ? AND b = ?");
                assert_eq!((placeholders, params), (2, 1));
            }
            other => panic!("expected ParamMismatch, got {other:?}"),
        }
    }

    #[test]
    fn raw_takes_precedence_over_builder_fields() {
        let mut stmt = salary_join();
        stmt.raw = Some(RawSql {
            sql: "select * from record where name = ?".into(),
            params: ("x",).into_params(),
        });
        let r = render_exist(stmt, &Postgres).unwrap();
        assert_eq!(r.sql, "select * from record where name = $1");
        assert_eq!(r.params.len(), 1);
    }

    #[test]
    fn raw_select_is_passed_through() {
        let mut stmt = Statement::new();
        stmt.raw = Some(RawSql {
            sql: "UPDATE t SET n = n + 1 WHERE id = ? RETURNING n".into(),
            params: (1_i32,).into_params(),
        });
        let r = render_select(stmt, &MySql).unwrap();
        assert_eq!(r.sql, "UPDATE t SET n = n + 1 WHERE id = ? RETURNING n");
    }

    #[test]
    fn raw_exist_runs_as_written() {
        let mut stmt = Statement::new();
        stmt.raw = Some(RawSql {
            sql: "select * from record where name = ? -- by name".into(),
            params: ("x",).into_params(),
        });
        let r = render_exist(stmt, &Postgres).unwrap();
        assert_eq!(r.sql, "select * from record where name = $1 -- by name");

        let mut stmt = Statement::new();
        stmt.raw = Some(RawSql {
            sql: "VALUES (1)".into(),
            params: Vec::new(),
        });
        assert_eq!(render_exist(stmt, &Postgres).unwrap().sql, "VALUES (1)");
    }

    #[test]
    fn raw_count_wraps_on_separate_lines() {
        let mut stmt = Statement::new();
        stmt.raw = Some(RawSql {
            sql: "WITH r AS (SELECT * FROM t) SELECT * FROM r -- recent?".into(),
            params: Vec::new(),
        });
        let r = render_count(stmt, &Postgres).unwrap();
        assert_eq!(
            r.sql,
            "SELECT COUNT(*) FROM (WITH r AS (SELECT * FROM t) SELECT * FROM r -- recent?\n) AS count_rows"
        );

        let mut stmt = Statement::new();
        stmt.raw = Some(RawSql {
            sql: "VALUES (1), (2);".into(),
            params: Vec::new(),
        });
        assert_eq!(
            render_count(stmt, &Postgres).unwrap().sql,
            "SELECT COUNT(*) FROM (VALUES (1), (2)\n) AS count_rows"
        );
    }
}
