//! Filter conditions.
//!
//! A [`Condition`] is either a leaf or a conjunction (`AND`) of conditions.
//! Leaves come in two shapes:
//!
//! - raw fragments with `?` placeholders (`"name = ?"`, `"a.id = b.aid AND b.x > ?"`),
//!   inserted verbatim apart from placeholder rewriting;
//! - structured comparisons built from [`Op`] over a validated column identifier,
//!   whose column is quoted by the dialect.
//!
//! Parameters bind positionally in the order leaves were appended.
//!
//! # Placeholders
//!
//! Every `?` outside a single-quoted literal or a double-quoted identifier is a
//! placeholder. Write `??` for a literal `?` (e.g. the Postgres `jsonb ? key`
//! operator).

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, IntoIdent};
use crate::param::{IntoParams, Param};
use tokio_postgres::types::ToSql;

/// Comparison operator for structured conditions.
///
/// # Example
/// ```ignore
/// use sessorm::{Condition, Op};
///
/// Condition::new("age", Op::gte(18))?;
/// Condition::new("status", Op::in_list(vec!["active", "pending"]))?;
/// Condition::new("deleted_at", Op::<i32>::is_null())?;
/// ```
#[derive(Debug, Clone)]
pub enum Op<T> {
    /// Equal: column = value
    Eq(T),
    /// Not equal: column <> value
    Ne(T),
    /// Greater than: column > value
    Gt(T),
    /// Greater than or equal: column >= value
    Gte(T),
    /// Less than: column < value
    Lt(T),
    /// Less than or equal: column <= value
    Lte(T),
    /// LIKE pattern match
    Like(T),
    /// NOT LIKE pattern match
    NotLike(T),
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
    /// IN (list)
    In(Vec<T>),
    /// NOT IN (list)
    NotIn(Vec<T>),
    /// BETWEEN a AND b
    Between(T, T),
}

impl<T> Op<T> {
    pub fn eq(val: T) -> Self {
        Op::Eq(val)
    }

    pub fn ne(val: T) -> Self {
        Op::Ne(val)
    }

    pub fn gt(val: T) -> Self {
        Op::Gt(val)
    }

    pub fn gte(val: T) -> Self {
        Op::Gte(val)
    }

    pub fn lt(val: T) -> Self {
        Op::Lt(val)
    }

    pub fn lte(val: T) -> Self {
        Op::Lte(val)
    }

    pub fn like(val: T) -> Self {
        Op::Like(val)
    }

    pub fn not_like(val: T) -> Self {
        Op::NotLike(val)
    }

    pub fn is_null() -> Self {
        Op::IsNull
    }

    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }

    pub fn in_list(vals: Vec<T>) -> Self {
        Op::In(vals)
    }

    pub fn not_in(vals: Vec<T>) -> Self {
        Op::NotIn(vals)
    }

    pub fn between(from: T, to: T) -> Self {
        Op::Between(from, to)
    }
}

#[derive(Debug, Clone)]
enum ConditionValue {
    Single(Param),
    Pair(Param, Param),
    List(Vec<Param>),
    None,
}

#[derive(Debug, Clone)]
enum ConditionInner {
    /// Caller-supplied fragment with `?` placeholders. Not validated.
    Raw { fragment: String, params: Vec<Param> },
    /// A structured comparison over a validated column.
    Expr {
        column: Ident,
        operator: &'static str,
        value: ConditionValue,
    },
    /// AND-conjunction. Never nested: [`Condition::and`] flattens.
    All(Vec<Condition>),
}

/// A filter condition.
#[derive(Debug, Clone)]
pub struct Condition(ConditionInner);

impl Condition {
    /// Create a raw fragment condition with positional `?` parameters.
    ///
    /// The fragment is inserted verbatim; the caller is responsible for its safety.
    /// A placeholder/parameter count disagreement surfaces as
    /// [`OrmError::ParamMismatch`] when the statement is rendered.
    pub fn raw(fragment: impl Into<String>, params: impl IntoParams) -> Self {
        Condition(ConditionInner::Raw {
            fragment: fragment.into(),
            params: params.into_params(),
        })
    }

    /// Create a structured condition from a column identifier and operator.
    pub fn new<I, T>(column: I, op: Op<T>) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        let column = column.into_ident()?;
        let (operator, value) = match op {
            Op::Eq(v) => ("=", ConditionValue::Single(Param::new(v))),
            Op::Ne(v) => ("<>", ConditionValue::Single(Param::new(v))),
            Op::Gt(v) => (">", ConditionValue::Single(Param::new(v))),
            Op::Gte(v) => (">=", ConditionValue::Single(Param::new(v))),
            Op::Lt(v) => ("<", ConditionValue::Single(Param::new(v))),
            Op::Lte(v) => ("<=", ConditionValue::Single(Param::new(v))),
            Op::Like(v) => ("LIKE", ConditionValue::Single(Param::new(v))),
            Op::NotLike(v) => ("NOT LIKE", ConditionValue::Single(Param::new(v))),
            Op::IsNull => ("IS NULL", ConditionValue::None),
            Op::IsNotNull => ("IS NOT NULL", ConditionValue::None),
            Op::In(vals) => ("IN", ConditionValue::List(vals.into_iter().map(Param::new).collect())),
            Op::NotIn(vals) => (
                "NOT IN",
                ConditionValue::List(vals.into_iter().map(Param::new).collect()),
            ),
            Op::Between(from, to) => (
                "BETWEEN",
                ConditionValue::Pair(Param::new(from), Param::new(to)),
            ),
        };

        Ok(Condition(ConditionInner::Expr {
            column,
            operator,
            value,
        }))
    }

    /// Equality over an already-boxed value. Used when deriving filters from entities.
    pub(crate) fn eq_param(column: Ident, value: Param) -> Self {
        Condition(ConditionInner::Expr {
            column,
            operator: "=",
            value: ConditionValue::Single(value),
        })
    }

    /// AND-combine `self` with `other`, flattening nested conjunctions.
    pub fn and(self, other: Condition) -> Self {
        let mut items = self.into_leaves();
        items.extend(other.into_leaves());
        Condition(ConditionInner::All(items))
    }

    /// AND-combine a list of conditions. Returns `None` for an empty list.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Option<Self> {
        conditions.into_iter().reduce(Condition::and)
    }

    fn into_leaves(self) -> Vec<Condition> {
        match self.0 {
            ConditionInner::All(items) => items,
            leaf => vec![Condition(leaf)],
        }
    }

    /// Number of leaves in this condition (1 for a leaf).
    pub fn len(&self) -> usize {
        match &self.0 {
            ConditionInner::All(items) => items.len(),
            _ => 1,
        }
    }

    /// Always `false`: a condition holds at least one leaf.
    pub fn is_empty(&self) -> bool {
        false
    }

    // ==================== Convenience constructors ====================

    /// column = value
    pub fn eq<I, T>(column: I, value: T) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::Eq(value))
    }

    /// column <> value
    pub fn ne<I, T>(column: I, value: T) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::Ne(value))
    }

    /// column > value
    pub fn gt<I, T>(column: I, value: T) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::Gt(value))
    }

    /// column < value
    pub fn lt<I, T>(column: I, value: T) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::Lt(value))
    }

    /// column IS NULL
    pub fn is_null<I: IntoIdent>(column: I) -> OrmResult<Self> {
        Self::new::<I, i32>(column, Op::IsNull)
    }

    /// column IS NOT NULL
    pub fn is_not_null<I: IntoIdent>(column: I) -> OrmResult<Self> {
        Self::new::<I, i32>(column, Op::IsNotNull)
    }

    /// column IN (values...)
    pub fn in_list<I, T>(column: I, values: Vec<T>) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::In(values))
    }

    /// column BETWEEN from AND to
    pub fn between<I, T>(column: I, from: T, to: T) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: ToSql + Send + Sync + 'static,
    {
        Self::new(column, Op::Between(from, to))
    }

    // ==================== Rendering ====================

    /// Append this condition to `out`, binding its parameters after those already in `params`.
    ///
    /// Raw leaves are parenthesized when they are part of a conjunction so that a
    /// fragment containing `OR` keeps its meaning.
    pub fn write_sql(
        &self,
        dialect: &dyn Dialect,
        out: &mut String,
        params: &mut Vec<Param>,
    ) -> OrmResult<()> {
        match &self.0 {
            ConditionInner::All(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    if item.is_raw() {
                        out.push('(');
                        item.write_sql(dialect, out, params)?;
                        out.push(')');
                    } else {
                        item.write_sql(dialect, out, params)?;
                    }
                }
                Ok(())
            }
            ConditionInner::Raw {
                fragment,
                params: own,
            } => {
                bind_fragment(fragment, own, dialect, out, params)?;
                Ok(())
            }
            ConditionInner::Expr {
                column,
                operator,
                value,
            } => {
                match value {
                    ConditionValue::List(vals) if vals.is_empty() => {
                        // Empty IN list - always false / NOT IN always true.
                        out.push_str(if *operator == "IN" { "1=0" } else { "1=1" });
                    }
                    ConditionValue::Single(v) => {
                        column.write_sql(dialect, out);
                        out.push(' ');
                        out.push_str(operator);
                        out.push(' ');
                        push_param(v.clone(), dialect, out, params);
                    }
                    ConditionValue::Pair(a, b) => {
                        column.write_sql(dialect, out);
                        out.push(' ');
                        out.push_str(operator);
                        out.push(' ');
                        push_param(a.clone(), dialect, out, params);
                        out.push_str(" AND ");
                        push_param(b.clone(), dialect, out, params);
                    }
                    ConditionValue::List(vals) => {
                        column.write_sql(dialect, out);
                        out.push(' ');
                        out.push_str(operator);
                        out.push_str(" (");
                        for (i, v) in vals.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            push_param(v.clone(), dialect, out, params);
                        }
                        out.push(')');
                    }
                    ConditionValue::None => {
                        column.write_sql(dialect, out);
                        out.push(' ');
                        out.push_str(operator);
                    }
                }
                Ok(())
            }
        }
    }

    fn is_raw(&self) -> bool {
        matches!(self.0, ConditionInner::Raw { .. })
    }
}

/// Anything [`Session::filter`](crate::Session::filter) accepts: a condition,
/// or the result of a fallible constructor such as [`Condition::eq`].
pub trait IntoCondition {
    fn into_condition(self) -> OrmResult<Condition>;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> OrmResult<Condition> {
        Ok(self)
    }
}

impl IntoCondition for OrmResult<Condition> {
    fn into_condition(self) -> OrmResult<Condition> {
        self
    }
}

fn push_param(value: Param, dialect: &dyn Dialect, out: &mut String, params: &mut Vec<Param>) {
    params.push(value);
    dialect.write_placeholder(params.len(), out);
}

/// Scanner state for `?` placeholders.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    QuotedIdent,
    BacktickIdent,
    LineComment,
    BlockComment,
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder,
}

/// Walk `fragment`, yielding verbatim text and placeholders in order.
///
/// `?` is only a placeholder in code: not inside `'...'`, `"..."` or
/// `` `...` ``, and not inside `--` or `/* */` comments.
fn scan_fragment<'a>(fragment: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let mut state = Scan::Code;
    let mut start = 0;
    let bytes = fragment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            Scan::Code => match b {
                b'\'' => state = Scan::Literal,
                b'"' => state = Scan::QuotedIdent,
                b'`' => state = Scan::BacktickIdent,
                b'-' if next == Some(b'-') => {
                    state = Scan::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Scan::BlockComment;
                    i += 1;
                }
                b'?' => {
                    emit(Piece::Text(&fragment[start..i]));
                    if next == Some(b'?') {
                        emit(Piece::Text("?"));
                        i += 1;
                    } else {
                        emit(Piece::Placeholder);
                    }
                    start = i + 1;
                }
                _ => {}
            },
            // Doubled quotes ('' / "" / ``) toggle out and straight back in, so
            // no special escape handling is needed.
            Scan::Literal if b == b'\'' => state = Scan::Code,
            Scan::QuotedIdent if b == b'"' => state = Scan::Code,
            Scan::BacktickIdent if b == b'`' => state = Scan::Code,
            Scan::LineComment if b == b'\n' => state = Scan::Code,
            Scan::BlockComment if b == b'*' && next == Some(b'/') => {
                state = Scan::Code;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    emit(Piece::Text(&fragment[start..]));
}

/// Count the placeholders in a raw fragment.
pub(crate) fn count_placeholders(fragment: &str) -> usize {
    let mut n = 0;
    scan_fragment(fragment, |piece| {
        if let Piece::Placeholder = piece {
            n += 1;
        }
    });
    n
}

/// Rewrite `fragment`'s `?` placeholders into the dialect's style, binding `own`
/// after the parameters already in `params`.
pub(crate) fn bind_fragment(
    fragment: &str,
    own: &[Param],
    dialect: &dyn Dialect,
    out: &mut String,
    params: &mut Vec<Param>,
) -> OrmResult<()> {
    let placeholders = count_placeholders(fragment);
    if placeholders != own.len() {
        return Err(OrmError::ParamMismatch {
            fragment: fragment.to_string(),
            placeholders,
            params: own.len(),
        });
    }

    let mut next = own.iter();
    scan_fragment(fragment, |piece| match piece {
        Piece::Text(chunk) => out.push_str(chunk),
        Piece::Placeholder => {
            if let Some(p) = next.next() {
                params.push(p.clone());
                dialect.write_placeholder(params.len(), out);
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    fn render(cond: &Condition) -> (String, usize) {
        let mut out = String::new();
        let mut params = Vec::new();
        cond.write_sql(&Postgres, &mut out, &mut params).unwrap();
        (out, params.len())
    }

    #[test]
    fn raw_leaf_is_verbatim_with_numbered_placeholders() {
        let cond = Condition::raw("salary.lid = ?", (1_i64,));
        assert_eq!(render(&cond), ("salary.lid = $1".to_string(), 1));
    }

    #[test]
    fn conjunction_keeps_append_order_and_param_order() {
        let cond = Condition::raw("a = ?", ("x",)).and(Condition::raw("b = ? OR c = ?", (1_i32, 2_i32)));
        let mut out = String::new();
        let mut params = Vec::new();
        cond.write_sql(&Postgres, &mut out, &mut params).unwrap();
        assert_eq!(out, "(a = $1) AND (b = $2 OR c = $3)");
        let dbg = format!("{params:?}");
        assert!(dbg.find("\"x\"").unwrap() < dbg.find('1').unwrap());
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let left = Condition::raw("a = 1", ()).and(Condition::raw("b = 2", ()));
        let right = Condition::raw("c = 3", ()).and(Condition::raw("d = 4", ()));
        let all = left.and(right);
        assert_eq!(all.len(), 4);
        assert_eq!(render(&all).0, "(a = 1) AND (b = 2) AND (c = 3) AND (d = 4)");
    }

    #[test]
    fn all_of_empty_is_none() {
        assert!(Condition::all(Vec::new()).is_none());
        let one = Condition::all(vec![Condition::raw("x = 1", ())]).unwrap();
        assert_eq!(render(&one).0, "x = 1");
    }

    #[test]
    fn structured_leaf_quotes_column() {
        let cond = Condition::eq("check_list.id", 1_i64).unwrap();
        assert_eq!(render(&cond).0, r#""check_list"."id" = $1"#);

        let mut out = String::new();
        let mut params = Vec::new();
        cond.write_sql(&MySql, &mut out, &mut params).unwrap();
        assert_eq!(out, "`check_list`.`id` = ?");
    }

    #[test]
    fn structured_in_between_and_null() {
        assert_eq!(
            render(&Condition::in_list("id", vec![1, 2, 3]).unwrap()),
            (r#""id" IN ($1, $2, $3)"#.to_string(), 3)
        );
        assert_eq!(render(&Condition::in_list("id", Vec::<i32>::new()).unwrap()).0, "1=0");
        assert_eq!(
            render(&Condition::new("id", Op::not_in(Vec::<i32>::new())).unwrap()).0,
            "1=1"
        );
        assert_eq!(
            render(&Condition::between("age", 18, 30).unwrap()).0,
            r#""age" BETWEEN $1 AND $2"#
        );
        assert_eq!(render(&Condition::is_null("deleted_at").unwrap()).0, r#""deleted_at" IS NULL"#);
    }

    #[test]
    fn mismatch_is_reported() {
        let cond = Condition::raw("a = ? AND b = ?", (1_i32,));
        let mut out = String::new();
        let mut params = Vec::new();
        let err = cond.write_sql(&Postgres, &mut out, &mut params).unwrap_err();
        assert!(matches!(
            err,
            OrmError::ParamMismatch {
                placeholders: 2,
                params: 1,
                ..
            }
        ));
        assert!(params.is_empty());
    }

    #[test]
    fn question_marks_in_literals_and_escapes_are_not_placeholders() {
        assert_eq!(count_placeholders("note = 'why?' AND id = ?"), 1);
        assert_eq!(count_placeholders(r#""odd?col" = ?"#), 1);
        assert_eq!(count_placeholders("doc ?? 'key'"), 0);
        assert_eq!(count_placeholders("note = 'it''s?' AND x = ?"), 1);

        let cond = Condition::raw("doc ?? 'k' AND id = ?", (5_i32,));
        assert_eq!(render(&cond).0, "doc ? 'k' AND id = $1");
    }

    #[test]
    fn question_marks_in_comments_and_backticks_are_not_placeholders() {
        assert_eq!(count_placeholders("id = ? -- why?\n"), 1);
        assert_eq!(count_placeholders("id = ? -- why?\nAND name = ?"), 2);
        assert_eq!(count_placeholders("id = ? /* what? */ AND x = ?"), 2);
        assert_eq!(count_placeholders("/* unterminated ?"), 0);
        assert_eq!(count_placeholders("`odd?col` = ?"), 1);
        assert_eq!(count_placeholders("x = 5 - ?"), 1);

        let cond = Condition::raw("id = ? -- why?\n", (1_i32,));
        assert_eq!(render(&cond), ("id = $1 -- why?\n".to_string(), 1));

        let mut out = String::new();
        let mut params = Vec::new();
        Condition::raw("`odd?col` = ?", (1_i32,))
            .write_sql(&MySql, &mut out, &mut params)
            .unwrap();
        assert_eq!(out, "`odd?col` = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn placeholders_continue_after_existing_params() {
        let mut out = String::new();
        let mut params = vec![Param::new(0_i32)];
        Condition::raw("x = ?", (1_i32,))
            .write_sql(&Postgres, &mut out, &mut params)
            .unwrap();
        assert_eq!(out, "x = $2");
        assert_eq!(params.len(), 2);
    }
}
