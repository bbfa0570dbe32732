//! Error types for dbkit

use thiserror::Error;

/// Result type alias for dbkit operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for statement compilation and execution.
///
/// Every compile-time variant describes a caller bug (wrong request shape),
/// never a transient condition; none of them is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    /// The table name is empty or whitespace.
    #[error("Missing table name")]
    MissingTableName,

    /// An operation that needs fields was given none.
    #[error("Missing fields: {0}")]
    MissingFields(String),

    /// A paged query was requested without an ordering.
    #[error("Order fields are required for a paged query on '{table}'")]
    MissingOrderBy { table: String },

    /// A numeric argument is out of range (page size, batch size, top).
    #[error("Invalid argument '{name}': {value}")]
    InvalidArgument { name: &'static str, value: String },

    /// No explicit qualifiers and no primary field to fall back to.
    #[error("No qualifiers available for '{table}': pass qualifiers or define a primary field")]
    MissingQualifiers { table: String },

    /// A qualifier names a field that is not part of the field list.
    #[error("Invalid qualifier field '{field}': not present in the field list")]
    InvalidQualifier { field: String },

    /// The target dialect cannot express the requested statement.
    #[error("{dialect} does not support {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: String,
    },

    /// A predicate is malformed (e.g. BETWEEN without two values).
    #[error("Invalid predicate on '{field}': {message}")]
    InvalidPredicate { field: String, message: String },

    /// Schema metadata violates an invariant (duplicate primary/identity).
    #[error("Invalid schema for '{table}': {message}")]
    InvalidSchema { table: String, message: String },

    /// The schema provider does not know the table.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A placeholder has no value in the supplied rows.
    #[error("Missing value for parameter '{name}'")]
    MissingParameter { name: String },

    /// Error reported by the execution collaborator.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Malformed schema document.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Create a missing-fields error
    pub fn missing_fields(message: impl Into<String>) -> Self {
        Self::MissingFields(message.into())
    }

    /// Create an unsupported-feature error for a dialect
    pub fn unsupported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            feature: feature.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this error reports an under-specified merge/update target.
    pub fn is_qualifier_error(&self) -> bool {
        matches!(
            self,
            Self::MissingQualifiers { .. } | Self::InvalidQualifier { .. }
        )
    }

    /// Check if this is a precondition violation on the request itself.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingTableName
                | Self::MissingFields(_)
                | Self::MissingOrderBy { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Check if this is a dialect capability gap.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
