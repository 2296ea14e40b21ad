//! Error types for the introspection and quality core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while connecting, introspecting, or analyzing.
///
/// Capability gaps are deliberately *not* represented here: an inspector
/// operation the backend cannot express returns an empty collection, and a
/// quality metric that cannot be computed for a column is surfaced as a
/// marked field on its report. Only genuine failures become `CoreError`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The engine could not be reached or authenticated.
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// A statement failed; carries the offending SQL for diagnosability.
    #[error("Query failed: {reason} (sql: {sql})")]
    QueryFailed { sql: String, reason: String },

    /// No viable engine could be constructed, or the engine was disposed.
    #[error("Engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    /// An identifier was rejected before it could reach generated SQL.
    #[error("Invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    /// Reading or writing the schema snapshot file failed.
    #[error("Cache I/O failed for {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic core error with custom message.
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    /// Creates a connection failure with the given reason.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a query failure carrying the offending SQL.
    pub fn query_failed(sql: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            sql: sql.into(),
            reason: reason.into(),
        }
    }

    /// Creates an engine-unavailable error with the given reason.
    pub fn engine_unavailable(reason: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-identifier error with the given reason.
    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }

    /// Creates a cache I/O error for the given path.
    pub fn cache_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Creates a custom error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Returns the SQL that triggered this error, if any.
    pub fn offending_sql(&self) -> Option<&str> {
        match self {
            Self::QueryFailed { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Converts serde_json errors to CoreError.
impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
