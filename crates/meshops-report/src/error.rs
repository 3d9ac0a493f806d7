/// Errors from the trigger-report subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Database connection or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
