//! Engine configuration.
//!
//! Built in code with the `with_*` methods or loaded from TOML:
//!
//! ```toml
//! dialect = "postgres"
//! query_timeout_ms = 5000
//! slow_query_threshold_ms = 250
//! max_logged_sql_len = 2048
//!
//! [pool]
//! max_size = 16
//! recycling = "verified"
//! ```

use crate::dialect::DialectKind;
use crate::error::OrmResult;
use serde::Deserialize;
use std::time::Duration;

/// Default cap on SQL text length in log events.
pub const DEFAULT_MAX_LOGGED_SQL_LEN: usize = 4096;

/// Configuration shared by every session of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "EngineConfigFile")]
pub struct EngineConfig {
    /// SQL dialect used for rendering.
    pub dialect: DialectKind,
    /// Default statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements slower than this are logged at `warn`.
    pub slow_query_threshold: Option<Duration>,
    /// SQL text in log events is truncated to this many bytes.
    pub max_logged_sql_len: usize,
    /// Connection pool settings, used by [`create_pool_from_config`](crate::create_pool_from_config).
    pub pool: PoolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            query_timeout: None,
            slow_query_threshold: None,
            max_logged_sql_len: DEFAULT_MAX_LOGGED_SQL_LEN,
            pool: PoolConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults (Postgres, no timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the query timeout duration.
    ///
    /// Statements exceeding it are cancelled and return [`OrmError::Timeout`](crate::OrmError::Timeout).
    /// A per-statement [`Session::timeout`](crate::Session::timeout) takes precedence.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the slow query threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_max_logged_sql_len(mut self, len: usize) -> Self {
        self.max_logged_sql_len = len;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

/// How pooled connections are checked before reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recycling {
    /// Only check that the connection is not closed.
    #[default]
    Fast,
    /// Run a test query before handing the connection out.
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub max_size: usize,
    pub recycling: Recycling,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            recycling: Recycling::Fast,
        }
    }
}

/// On-disk shape: durations are whole milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineConfigFile {
    dialect: DialectKind,
    query_timeout_ms: Option<u64>,
    slow_query_threshold_ms: Option<u64>,
    max_logged_sql_len: Option<usize>,
    pool: PoolConfig,
}

impl From<EngineConfigFile> for EngineConfig {
    fn from(file: EngineConfigFile) -> Self {
        Self {
            dialect: file.dialect,
            query_timeout: file.query_timeout_ms.map(Duration::from_millis),
            slow_query_threshold: file.slow_query_threshold_ms.map(Duration::from_millis),
            max_logged_sql_len: file
                .max_logged_sql_len
                .unwrap_or(DEFAULT_MAX_LOGGED_SQL_LEN),
            pool: file.pool,
        }
    }
}
