//! Database-specific error types and conversions.

use fedreg_core::error::FedRegError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    /// A unique index rejected the write.
    #[error("Unique constraint violated: {0}")]
    Constraint(String),

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classifies an error raised by a statement of a checked response.
    pub fn from_statement(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Constraint(message)
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for FedRegError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FedRegError::NotFound { entity, id },
            DbError::Constraint(message) => FedRegError::Conflict { message },
            DbError::Decode(message) => FedRegError::Internal(message),
            other => FedRegError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_maps_to_conflict() {
        let err: FedRegError = DbError::Constraint("idx_provider_name_type".into()).into();
        assert!(matches!(err, FedRegError::Conflict { .. }));
    }

    #[test]
    fn not_found_keeps_entity() {
        let err: FedRegError = DbError::NotFound {
            entity: "region".into(),
            id: "r1".into(),
        }
        .into();
        assert!(matches!(err, FedRegError::NotFound { entity, .. } if entity == "region"));
    }
}
