use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure taxonomy shared by every service. The HTTP layer maps each
/// variant onto a status code; `Internal` is the only variant whose message
/// is withheld from clients.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
