//! Engine: owns the dialect, schema registry and configuration, and hands out sessions.

use crate::client::GenericClient;
use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::schema::{Entity, SchemaRegistry, TableSchema};
use crate::session::Session;
use std::sync::Arc;

/// Shared, immutable query engine.
///
/// Cloning is cheap; every clone shares the same dialect and registry.
///
/// # Example
///
/// ```ignore
/// use sessorm::{Engine, EngineConfig};
///
/// let engine = Engine::builder()
///     .config(EngineConfig::from_toml_str(&std::fs::read_to_string("sessorm.toml")?)?)
///     .register::<User>()
///     .build();
///
/// let client = pool.get().await?;
/// let mut session = engine.session(&client);
/// let taken = session.table_of::<User>().where_("email = ?", (email,)).exist().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    dialect: Arc<dyn Dialect>,
    registry: Arc<SchemaRegistry>,
    config: Arc<EngineConfig>,
}

impl Engine {
    /// An engine with default configuration and no registered types.
    pub fn new<D: Dialect + 'static>(dialect: D) -> Self {
        Self::builder().dialect(Arc::new(dialect)).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Open a session over `client`. Sessions are cheap; create one per logical flow.
    pub fn session<'a, C: GenericClient>(&'a self, client: &'a C) -> Session<'a, C> {
        Session::new(self, client)
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    dialect: Option<Arc<dyn Dialect>>,
    registry: SchemaRegistry,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom dialect instead of the one named by the configuration.
    pub fn dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Register an entity type so `table_of` and `exist_by` can resolve it.
    pub fn register<T: Entity>(mut self) -> Self {
        self.registry.register::<T>();
        self
    }

    /// Register a hand-written schema for `T`.
    pub fn register_schema<T: 'static>(mut self, schema: TableSchema) -> Self {
        self.registry.register_schema::<T>(schema);
        self
    }

    pub fn build(self) -> Engine {
        #[cfg(feature = "tracing")]
        if self.dialect.is_none() && self.config.dialect.is_render_only() {
            tracing::warn!(
                target: "sessorm.sql",
                dialect = ?self.config.dialect,
                "render-only dialect configured; terminals that execute will fail on Postgres"
            );
        }
        let dialect = self.dialect.unwrap_or_else(|| self.config.dialect.build());
        Engine {
            dialect,
            registry: Arc::new(self.registry),
            config: Arc::new(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectKind, MySql};

    #[test]
    fn dialect_comes_from_config_unless_overridden() {
        let engine = Engine::builder()
            .config(EngineConfig::new().with_dialect(DialectKind::Sqlite))
            .build();
        assert_eq!(engine.dialect().name(), "sqlite");

        let engine = Engine::builder()
            .config(EngineConfig::new().with_dialect(DialectKind::Sqlite))
            .dialect(Arc::new(MySql))
            .build();
        assert_eq!(engine.dialect().name(), "mysql");
    }

    #[test]
    fn clones_share_registry() {
        struct Audit;
        let engine = Engine::builder()
            .register_schema::<Audit>(TableSchema::new("audit_log").with_columns(&["id"]))
            .build();
        let clone = engine.clone();
        assert!(Arc::ptr_eq(&engine.registry, &clone.registry));
        assert_eq!(clone.registry().resolve_type::<Audit>().unwrap().name, "audit_log");
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
