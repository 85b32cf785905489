use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Permission denied")]
    Permission,
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl ServiceError {
    /// Reply text shown to the chat user.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(msg) => msg.clone(),
            ServiceError::Permission => "You are not allowed to run this command.".to_string(),
            ServiceError::Duplicate(msg) => format!("Already exists: {msg}."),
            ServiceError::NotFound(msg) => format!("Not found: {msg}."),
            ServiceError::Database(_) => "Internal error, please try again later.".to_string(),
        }
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ServiceError::Duplicate(detail),
            _ => ServiceError::Database(err),
        }
    }
}
