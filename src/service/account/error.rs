use teloxide::types::UserId;

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("User {0} is not registered")]
    UserNotFound(UserId),
    #[error("Malformed user row: {0}")]
    MalformedRow(String),
    #[error("Validity length {0} days is out of range")]
    ValidityOutOfRange(i64),
}

impl From<libsql::Error> for AccountError {
    fn from(error: libsql::Error) -> Self {
        AccountError::Storage(StorageError::Turso(error))
    }
}
