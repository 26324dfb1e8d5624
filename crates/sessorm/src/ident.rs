//! SQL identifier handling.
//!
//! [`Ident`] represents a validated identifier (schema/table/column), supporting
//! dotted notation and quoted parts. The renderer writes identifiers through the
//! session's [`Dialect`], so the same `Ident` renders as `"users"` on Postgres
//! and `` `users` `` on MySQL.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`
//!
//! [`TableRef`] adds an optional alias on top (`"salary s"`, `"salary AS s"`).

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    /// Unquoted identifier: must match `[A-Za-z_][A-Za-z0-9_$]*`.
    Unquoted(String),
    /// Quoted identifier: allows any characters except NUL.
    Quoted(String),
}

impl IdentPart {
    /// The bare name, without quotes.
    pub fn name(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::invalid("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::invalid("Identifier cannot contain NUL character"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(OrmError::invalid("Trailing '.' in identifier"));
                        }
                    }
                    Some(c) => {
                        return Err(OrmError::invalid(format!(
                            "Expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            // Escaped quote: ""
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return Err(OrmError::invalid("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::invalid("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let valid = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !valid {
                    return Err(OrmError::invalid(format!(
                        "Invalid character in identifier '{s}': '{c}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(OrmError::invalid("Empty identifier segment"));
            }
            parts.push(IdentPart::Unquoted(name));
        }

        if parts.is_empty() {
            return Err(OrmError::invalid("Empty identifier"));
        }

        Ok(Self { parts })
    }

    /// The last part (table name of `schema.table`, column of `t.col`).
    pub fn last(&self) -> &str {
        self.parts.last().map(IdentPart::name).unwrap_or_default()
    }

    /// Append the identifier, each part quoted by `dialect`.
    pub fn write_sql(&self, dialect: &dyn Dialect, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            dialect.write_quoted(part.name(), out);
        }
    }

    /// Render the identifier with `dialect` quoting.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();
        self.write_sql(dialect, &mut out);
        out
    }
}

/// Convert an input into an [`Ident`].
///
/// This is mainly for ergonomics in builder APIs.
pub trait IntoIdent {
    fn into_ident(self) -> OrmResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> OrmResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> OrmResult<Ident> {
        Ident::parse(&self)
    }
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: Ident,
    pub alias: Option<Ident>,
}

impl TableRef {
    /// Parse `name`, `name alias` or `name AS alias`.
    pub fn parse(s: &str) -> OrmResult<Self> {
        let tokens = split_table_tokens(s)?;
        let (name, alias) = match tokens.as_slice() {
            [] => return Err(OrmError::invalid("Table name cannot be empty")),
            [name] => (*name, None),
            [name, alias] => (*name, Some(*alias)),
            [name, kw, alias] if kw.eq_ignore_ascii_case("as") => (*name, Some(*alias)),
            _ => {
                return Err(OrmError::invalid(format!(
                    "Invalid table reference '{s}' (expected `name`, `name alias` or `name AS alias`)"
                )));
            }
        };
        Ok(Self {
            name: Ident::parse(name)?,
            alias: alias.map(Ident::parse).transpose()?,
        })
    }

    /// Reference a table by an already validated identifier.
    pub fn from_ident(name: Ident) -> Self {
        Self { name, alias: None }
    }

    /// Append `<quoted name>[ AS <quoted alias>]`.
    pub fn write_sql(&self, dialect: &dyn Dialect, out: &mut String) {
        self.name.write_sql(dialect, out);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            alias.write_sql(dialect, out);
        }
    }
}

/// Split on whitespace outside double-quoted sections.
fn split_table_tokens(s: &str) -> OrmResult<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        if c == '"' {
            // A doubled quote closes and reopens, leaving `quoted` unchanged.
            quoted = !quoted;
        }
        if c.is_whitespace() && !quoted {
            if let Some(st) = start.take() {
                tokens.push(&s[st..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if quoted {
        return Err(OrmError::invalid("Unclosed quoted identifier"));
    }
    if let Some(st) = start {
        tokens.push(&s[st..]);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn ident_simple() {
        let ident = Ident::parse("users").unwrap();
        assert_eq!(ident.to_sql(&Postgres), r#""users""#);
    }

    #[test]
    fn ident_dotted_quotes_each_part() {
        let ident = Ident::parse("public.users").unwrap();
        assert_eq!(ident.to_sql(&Postgres), r#""public"."users""#);
        assert_eq!(ident.to_sql(&MySql), "`public`.`users`");
    }

    #[test]
    fn ident_quoted_with_escape() {
        let ident = Ident::parse(r#""has""quote""#).unwrap();
        assert_eq!(ident.last(), r#"has"quote"#);
        assert_eq!(ident.to_sql(&Postgres), r#""has""quote""#);
    }

    #[test]
    fn ident_mixed_quoted_unquoted() {
        let ident = Ident::parse(r#"public."UserTable".id"#).unwrap();
        assert_eq!(ident.to_sql(&Postgres), r#""public"."UserTable"."id""#);
    }

    #[test]
    fn ident_with_dollar() {
        assert!(Ident::parse("my_var$1").is_ok());
    }

    #[test]
    fn ident_rejects_malformed() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("1table").is_err());
        assert!(Ident::parse("my table").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse(r#""unclosed"#).is_err());
        assert!(Ident::parse("users; drop table users; --").is_err());
    }

    #[test]
    fn table_ref_accepts_alias_forms() {
        let plain = TableRef::parse("salary").unwrap();
        assert!(plain.alias.is_none());

        let short = TableRef::parse("salary s").unwrap();
        let long = TableRef::parse("salary  AS  s").unwrap();
        assert_eq!(short, long);

        let mut out = String::new();
        long.write_sql(&Postgres, &mut out);
        assert_eq!(out, r#""salary" AS "s""#);
    }

    #[test]
    fn table_ref_rejects_garbage() {
        assert!(matches!(
            TableRef::parse("   "),
            Err(OrmError::InvalidArgument(_))
        ));
        assert!(TableRef::parse("a b c").is_err());
        assert!(TableRef::parse("a; b").is_err());
    }

    #[test]
    fn table_ref_keeps_spaces_inside_quotes() {
        let spaced = TableRef::parse(r#""my table""#).unwrap();
        assert!(spaced.alias.is_none());
        assert_eq!(spaced.name.last(), "my table");

        let aliased = TableRef::parse(r#"public."my ""odd"" table" AS "t 1""#).unwrap();
        let mut out = String::new();
        aliased.write_sql(&Postgres, &mut out);
        assert_eq!(out, r#""public"."my ""odd"" table" AS "t 1""#);

        assert!(matches!(
            TableRef::parse(r#""my table"#),
            Err(OrmError::InvalidArgument(_))
        ));
    }
}
