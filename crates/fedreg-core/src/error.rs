//! Error types for the Federation Registry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FedRegError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A natural key is already taken within its uniqueness scope.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// A referenced id is not part of the allowed scope, or an attribute
    /// set is malformed.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Required scoping context is missing or empty.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    #[error("Multiple {entity} entities match {filter}")]
    MultipleMatches { entity: String, filter: String },

    #[error("Cardinality violation on {relation}: {message}")]
    Cardinality { relation: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FedRegError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type FedRegResult<T> = Result<T, FedRegError>;
