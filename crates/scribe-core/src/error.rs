//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Message carried by every authorization rejection.
pub const NOT_AUTHORIZED_MESSAGE: &str = "Not authorized!";

/// Status code shared by validation and authorization rejections.
pub const UNPROCESSABLE_ENTITY: u16 = 422;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A rule in the active rule set rejected the changed attributes.
    #[error("{0}")]
    Validation(String),

    /// Neither ownership nor the administrator role allowed the mutation.
    #[error("Not authorized!")]
    NotAuthorized,

    /// The operation needs an authenticated actor and none was given.
    #[error("Unauthenticated.")]
    Unauthenticated,

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Repository failure: {0}")]
    Repository(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// HTTP-style status classification of the failure.
    pub fn status_code(&self) -> u16 {
        match self {
            DomainError::Validation(_) | DomainError::NotAuthorized => UNPROCESSABLE_ENTITY,
            DomainError::Unauthenticated => 401,
            DomainError::NotFound { .. } => 404,
            DomainError::Repository(RepoError::NotFound) => 404,
            DomainError::Repository(RepoError::Constraint(_)) => 409,
            DomainError::Repository(_) | DomainError::Internal(_) => 500,
        }
    }

    /// Validation and authorization rejections are never worth retrying.
    pub fn is_permanent(&self) -> bool {
        self.status_code() < 500
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
