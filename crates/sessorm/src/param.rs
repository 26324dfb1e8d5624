//! Bound parameter values.

use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A clone-friendly parameter wrapper.
///
/// Statements hand their parameters to the renderer by cloning the `Arc`, so a
/// rendered statement never copies the underlying values.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&self.0).finish()
    }
}

/// Conversion into an ordered list of bound parameters.
///
/// Implemented for `()`, tuples of up to eight `ToSql` values and `Vec<T>`, so
/// `where_` calls read naturally:
///
/// ```ignore
/// session.where_("name = ? AND age > ?", ("alice", 30_i32));
/// session.where_("deleted_at IS NULL", ());
/// ```
pub trait IntoParams {
    fn into_params(self) -> Vec<Param>;
}

impl IntoParams for () {
    fn into_params(self) -> Vec<Param> {
        Vec::new()
    }
}

impl<T> IntoParams for Vec<T>
where
    T: ToSql + Send + Sync + 'static,
{
    fn into_params(self) -> Vec<Param> {
        self.into_iter().map(Param::new).collect()
    }
}

macro_rules! impl_into_params_for_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> IntoParams for ($($name,)+)
        where
            $($name: ToSql + Send + Sync + 'static),+
        {
            #[allow(non_snake_case)]
            fn into_params(self) -> Vec<Param> {
                let ($($name,)+) = self;
                vec![$(Param::new($name)),+]
            }
        }
    };
}

impl_into_params_for_tuple!(A);
impl_into_params_for_tuple!(A, B);
impl_into_params_for_tuple!(A, B, C);
impl_into_params_for_tuple!(A, B, C, D);
impl_into_params_for_tuple!(A, B, C, D, E);
impl_into_params_for_tuple!(A, B, C, D, E, F);
impl_into_params_for_tuple!(A, B, C, D, E, F, G);
impl_into_params_for_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_has_no_params() {
        assert!(().into_params().is_empty());
    }

    #[test]
    fn tuple_keeps_order_and_arity() {
        let params = ("a", 1_i32, 2_i64).into_params();
        assert_eq!(params.len(), 3);
        let rendered = format!("{params:?}");
        assert!(rendered.find("\"a\"").unwrap() < rendered.find('1').unwrap());
    }

    #[test]
    fn vec_of_values_converts_each() {
        assert_eq!(vec![1_i32, 2, 3].into_params().len(), 3);
    }
}
