//! Row mapping traits and utilities

use crate::error::OrmResult;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// Usually derived with `#[derive(FromRow)]`.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::OrmError::decode(column, e.to_string()))
    }
}

macro_rules! impl_from_row_for_tuple {
    ($($idx:tt => $name:ident),+) => {
        /// Positional mapping: column `i` into tuple field `i`.
        impl<$($name),+> FromRow for ($($name,)+)
        where
            $($name: for<'a> tokio_postgres::types::FromSql<'a>),+
        {
            fn from_row(row: &Row) -> OrmResult<Self> {
                Ok(($(
                    row.try_get::<usize, $name>($idx)
                        .map_err(|e| crate::error::OrmError::decode(stringify!($idx), e.to_string()))?,
                )+))
            }
        }
    };
}

impl_from_row_for_tuple!(0 => A);
impl_from_row_for_tuple!(0 => A, 1 => B);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_for_tuple!(0 => A, 1 => B, 2 => C, 3 => D);
