use thiserror::Error;

/// Top-level error taxonomy, matching the categories a module operator
/// needs to distinguish: what to retry, what to surface, what to drop.
#[derive(Error, Debug)]
pub enum FeedEaterError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transient transport error: {0}")]
    Transient(String),

    #[error("per-event decode error: {0}")]
    Decode(String),

    #[error("per-event persistence error: {0}")]
    Persistence(String),

    #[error("sweep-fatal error: {0}")]
    SweepFatal(String),

    #[error("scheduler-fatal error: {0}")]
    SchedulerFatal(String),

    #[error("context generation error: {0}")]
    ContextGeneration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = FeedEaterError> = std::result::Result<T, E>;
