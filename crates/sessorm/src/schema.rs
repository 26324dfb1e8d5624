//! Schema resolution: Rust type → table name, columns and primary key.
//!
//! Types describe themselves through [`Entity`] (normally derived). An
//! [`Engine`](crate::Engine) registers the entities it knows about in a
//! [`SchemaRegistry`] at build time; sessions only read from it.

use crate::condition::Condition;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::param::Param;
use std::any::{TypeId, type_name};
use std::collections::HashMap;

/// One mapped field of an entity value.
#[derive(Debug, Clone)]
pub struct FieldValue {
    /// Column the field maps to.
    pub column: &'static str,
    /// The field's current value.
    pub value: Param,
    /// Whether the value equals the type's default ("zero") value.
    pub is_default: bool,
}

/// Table metadata for a mapped struct.
///
/// This trait is automatically implemented by `#[derive(Entity)]`.
pub trait Entity: 'static {
    /// The database table name.
    const TABLE: &'static str;

    /// Column names in declaration order.
    const COLUMNS: &'static [&'static str];

    /// The primary key column name, if any.
    const PRIMARY_KEY: Option<&'static str>;

    /// Current values of the filterable fields, in declaration order.
    fn field_values(&self) -> Vec<FieldValue>;
}

/// `true` when `value` equals `T::default()`.
///
/// Used by the derive to decide which fields of a filter struct are set.
pub fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Column information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Whether this column is the primary key.
    pub is_primary_key: bool,
}

/// Table information resolved for a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name, optionally schema-qualified.
    pub name: String,
    /// Column metadata in declaration order.
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Build the schema of an [`Entity`].
    pub fn from_entity<T: Entity>() -> Self {
        let schema = Self::new(T::TABLE).with_columns(T::COLUMNS);
        match T::PRIMARY_KEY {
            Some(pk) => schema.with_primary_key(pk),
            None => schema,
        }
    }

    /// Add multiple columns to this table schema.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            self.columns.push(ColumnMeta {
                name: col.to_string(),
                is_primary_key: false,
            });
        }
        self
    }

    /// Set the primary key column.
    pub fn with_primary_key(mut self, pk: &str) -> Self {
        for col in &mut self.columns {
            col.is_primary_key = col.name == pk;
        }
        if !self.has_column(pk) {
            self.columns.push(ColumnMeta {
                name: pk.to_string(),
                is_primary_key: true,
            });
        }
        self
    }

    /// Check if this table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
    }
}

/// Registry of table schemas keyed by Rust type.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<TypeId, TableSchema>,
}

impl SchemaRegistry {
    /// Create a new empty schema registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type. Re-registering replaces the previous schema.
    pub fn register<T: Entity>(&mut self) {
        self.tables
            .insert(TypeId::of::<T>(), TableSchema::from_entity::<T>());
    }

    /// Register a hand-written schema for any type.
    pub fn register_schema<T: 'static>(&mut self, schema: TableSchema) {
        self.tables.insert(TypeId::of::<T>(), schema);
    }

    /// Look up a schema by type id. `type_name` only feeds the error.
    pub fn resolve(&self, type_id: TypeId, type_name: &'static str) -> OrmResult<&TableSchema> {
        self.tables
            .get(&type_id)
            .ok_or(OrmError::UnknownType(type_name))
    }

    /// Look up the schema registered for `T`.
    pub fn resolve_type<T: 'static>(&self) -> OrmResult<&TableSchema> {
        self.resolve(TypeId::of::<T>(), type_name::<T>())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Derive one equality condition per non-default field value.
///
/// Default-valued fields are skipped, so a filter struct with nothing set
/// yields no conditions. A column the schema does not know is an error.
pub fn filter_conditions(
    schema: &TableSchema,
    values: Vec<FieldValue>,
) -> OrmResult<Vec<Condition>> {
    values
        .into_iter()
        .filter(|v| !v.is_default)
        .map(|v| {
            if !schema.has_column(v.column) {
                return Err(OrmError::invalid(format!(
                    "column '{}' is not part of table '{}'",
                    v.column, schema.name
                )));
            }
            Ok(Condition::eq_param(Ident::parse(v.column)?, v.value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;

    #[derive(Default)]
    struct Record {
        id: i64,
        name: String,
    }

    impl Entity for Record {
        const TABLE: &'static str = "record";
        const COLUMNS: &'static [&'static str] = &["id", "name"];
        const PRIMARY_KEY: Option<&'static str> = Some("id");

        fn field_values(&self) -> Vec<FieldValue> {
            vec![
                FieldValue {
                    column: "id",
                    value: Param::new(self.id),
                    is_default: is_zero(&self.id),
                },
                FieldValue {
                    column: "name",
                    value: Param::new(self.name.clone()),
                    is_default: is_zero(&self.name),
                },
            ]
        }
    }

    #[test]
    fn schema_from_entity() {
        let schema = TableSchema::from_entity::<Record>();
        assert_eq!(schema.name, "record");
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.primary_key(), Some("id"));
    }

    #[test]
    fn resolve_registered_and_unknown() {
        let mut registry = SchemaRegistry::new();
        registry.register::<Record>();
        assert_eq!(registry.resolve_type::<Record>().unwrap().name, "record");

        struct Ghost;
        match registry.resolve_type::<Ghost>() {
            Err(OrmError::UnknownType(name)) => assert!(name.ends_with("Ghost")),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn filter_uses_only_non_default_fields() {
        let schema = TableSchema::from_entity::<Record>();

        let empty = filter_conditions(&schema, Record::default().field_values()).unwrap();
        assert!(empty.is_empty());

        let only_name = Record {
            name: "x".into(),
            ..Default::default()
        };
        let conds = filter_conditions(&schema, only_name.field_values()).unwrap();
        assert_eq!(conds.len(), 1);

        let mut sql = String::new();
        let mut params = Vec::new();
        conds[0].write_sql(&Postgres, &mut sql, &mut params).unwrap();
        assert_eq!(sql, r#""name" = $1"#);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn filter_rejects_unknown_column() {
        let schema = TableSchema::new("record").with_columns(&["id"]);
        let values = vec![FieldValue {
            column: "nickname",
            value: Param::new("x"),
            is_default: false,
        }];
        assert!(matches!(
            filter_conditions(&schema, values),
            Err(OrmError::InvalidArgument(_))
        ));
    }
}
