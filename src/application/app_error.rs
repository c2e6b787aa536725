use std::fmt;

use thiserror::Error;

/// Which Directory Service round trip produced a persistence failure.
///
/// Severity differs per stage: an `Insert` failure aborts the enrollment, a
/// `WriteBack` failure only degrades the stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistenceStage {
    DuplicateCheck,
    Insert,
    ReadBack,
    Count,
    WriteBack,
    Atomic,
    Query,
}

impl PersistenceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceStage::DuplicateCheck => "duplicate_check",
            PersistenceStage::Insert => "insert",
            PersistenceStage::ReadBack => "read_back",
            PersistenceStage::Count => "count",
            PersistenceStage::WriteBack => "write_back",
            PersistenceStage::Atomic => "atomic",
            PersistenceStage::Query => "query",
        }
    }
}

impl fmt::Display for PersistenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Email is already on the waitlist")]
    DuplicateEmail,

    #[error("Persistence error during {stage}: {message}")]
    Persistence {
        stage: PersistenceStage,
        message: String,
    },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn persistence(stage: PersistenceStage, message: impl Into<String>) -> Self {
        AppError::Persistence {
            stage,
            message: message.into(),
        }
    }

    /// Re-tags a persistence error with the workflow stage it surfaced in.
    /// A missing row is a persistence failure from the workflow's point of view.
    /// Other variants pass through untouched.
    pub fn at_stage(self, stage: PersistenceStage) -> Self {
        match self {
            AppError::Persistence { message, .. } => AppError::Persistence { stage, message },
            AppError::NotFound => AppError::Persistence {
                stage,
                message: "row not found".into(),
            },
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    AlreadyEnrolled,
    DatabaseError,
    NotificationError,
    RateLimited,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyEnrolled => "ALREADY_ENROLLED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotificationError => "NOTIFICATION_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
