use axum::http::StatusCode;
use thiserror::Error;

use crate::app::{
    errors::DefaultApiError,
    models::api_error::ApiError,
    util::sqlx::{get_code_from_db_err, SqlStateCodes},
};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction with this ID already exists")]
    Duplicate,
    #[error("transaction not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(String),
}

impl TransactionError {
    pub fn value(&self) -> ApiError {
        match self {
            Self::Duplicate => ApiError {
                code: StatusCode::CONFLICT,
                message: "Transaction already exists.".to_string(),
            },
            Self::NotFound => ApiError {
                code: StatusCode::NOT_FOUND,
                message: "Transaction not found.".to_string(),
            },
            Self::Storage(_) => DefaultApiError::InternalServerError.value(),
        }
    }
}

impl From<sqlx::Error> for TransactionError {
    /// The unique constraint on transaction_id is authoritative: a 23505
    /// from any statement maps to Duplicate, whether or not a pre-check
    /// already passed.
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return Self::NotFound;
        }

        if let Some(db_err) = e.as_database_error() {
            if let Some(code) = get_code_from_db_err(db_err) {
                if code == SqlStateCodes::UNIQUE_VIOLATION {
                    return Self::Duplicate;
                }
            }
        }

        tracing::error!(%e);
        Self::Storage(e.to_string())
    }
}
