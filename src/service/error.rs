use crate::storage::StorageError;

use super::{account::AccountError, edit::EditError, generation::GenerationError, session::SessionError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Other error: {0}")]
    Other(String),
    #[error("Account error: {0}")]
    Account(AccountError),
    #[error("Session error: {0}")]
    Session(SessionError),
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

impl From<AccountError> for ServiceError {
    fn from(e: AccountError) -> Self {
        Self::Account(e)
    }
}

impl From<SessionError> for ServiceError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        Self::Other(e.to_string())
    }
}
