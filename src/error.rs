//! Error types for the MySQL execution layer.
//!
//! This module defines all error types using `thiserror`. Engine-level
//! failures are wrapped with the original error message retained as context;
//! nothing in this crate retries automatically.

use crate::models::PropertyType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    /// A session to the engine could not be established.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Admission control rejected an acquisition: every slot is in use.
    #[error("too many connections: the connection limit is {limit}")]
    PoolExhausted { limit: usize },

    /// The engine rejected or failed a statement.
    #[error("query failed: {message}")]
    Query { message: String },

    /// A bound value's runtime type disagrees with the declared property
    /// type, or a property-level validation rule rejected it.
    #[error("invalid value for property `{property}`: {message}")]
    Validation { property: String, message: String },

    /// A property declares a type this layer cannot bind, decode, or
    /// generate a value for.
    #[error("property `{property}` has unsupported type {ty}")]
    UnsupportedType { property: String, ty: PropertyType },

    /// A filter used an operator in a way the compiler does not support.
    /// The offending operands are rendered into the message for diagnosis.
    #[error("unsupported operator {operator} applied to {operands}")]
    UnsupportedOperator { operator: String, operands: String },

    /// Commit or rollback was called with an empty transaction stack.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// A bind referenced a property the metadata does not declare.
    #[error("property `{property}` is not defined by the metadata")]
    UnknownProperty { property: String },
}

impl DriverError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a pool-exhausted error.
    pub fn pool_exhausted(limit: usize) -> Self {
        Self::PoolExhausted { limit }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-type error.
    pub fn unsupported_type(property: impl Into<String>, ty: PropertyType) -> Self {
        Self::UnsupportedType {
            property: property.into(),
            ty,
        }
    }

    /// Create an unsupported-operator error.
    pub fn unsupported_operator(
        operator: impl Into<String>,
        operands: impl Into<String>,
    ) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
            operands: operands.into(),
        }
    }

    /// Create an unknown-property error.
    pub fn unknown_property(property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
        }
    }
}

/// Convert engine client errors to DriverError.
///
/// Errors raised before a session exists map to `Connection`; everything
/// else is a statement-level failure and maps to `Query`.
impl From<mysql::Error> for DriverError {
    fn from(err: mysql::Error) -> Self {
        match err {
            mysql::Error::UrlError(e) => DriverError::connection(e.to_string()),
            mysql::Error::IoError(e) => DriverError::connection(format!("i/o error: {e}")),
            other => DriverError::query(other.to_string()),
        }
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverError::connection("refused");
        assert!(err.to_string().contains("connection failed"));

        let err = DriverError::pool_exhausted(10);
        assert!(err.to_string().contains("limit is 10"));
    }

    #[test]
    fn test_validation_names_property() {
        let err = DriverError::validation("price", "expected float, got string");
        let text = err.to_string();
        assert!(text.contains("`price`"));
        assert!(text.contains("expected float"));
    }

    #[test]
    fn test_unsupported_operator_carries_operands() {
        let err = DriverError::unsupported_operator(">", "empty operand set on `id`");
        assert!(err.to_string().contains("empty operand set"));
    }

    #[test]
    fn test_no_active_transaction_display() {
        assert_eq!(
            DriverError::NoActiveTransaction.to_string(),
            "no active transaction"
        );
    }
}
