use sqlx::PgPool;

use crate::app_error::{AppError, PersistenceStage};

pub mod waitlist;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            // The only unique column on the waitlist table is email.
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::DuplicateEmail,
            _ => {
                // Log the actual error for debugging, but don't expose details
                tracing::error!(error = ?err, "Database error");
                AppError::persistence(PersistenceStage::Query, "Database operation failed")
            }
        }
    }
}
