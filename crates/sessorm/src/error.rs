//! Error types for sessorm

use thiserror::Error;

/// Result type alias for sessorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for session building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Malformed builder input: unknown join kind, empty or invalid identifier,
    /// or an operation that does not apply in the current mode.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A condition fragment's `?` placeholders disagree with its bound parameters.
    #[error("Parameter mismatch in '{fragment}': {placeholders} placeholder(s), {params} parameter(s)")]
    ParamMismatch {
        fragment: String,
        placeholders: usize,
        params: usize,
    },

    /// Nothing to render: no table was resolved and no raw SQL was set.
    #[error("Incomplete statement: {0}")]
    IncompleteStatement(String),

    /// The type has no registered schema.
    #[error("Unknown type: {0} has no registered schema")]
    UnknownType(&'static str),

    /// The store rejected the statement.
    #[error("Store error while executing `{statement}`: {source}")]
    Store {
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Query returned more rows than expected
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Check if this is a store error (including constraint violations)
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Store { .. }
                | Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::CheckViolation(_)
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Classify a tokio_postgres error raised while running `statement`.
    pub fn from_db_error(statement: &str, err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                _ => {}
            }
        }
        Self::Store {
            statement: statement.to_string(),
            source: err,
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
