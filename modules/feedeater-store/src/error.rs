use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StoreError> for feedeater_common::FeedEaterError {
    fn from(e: StoreError) -> Self {
        feedeater_common::FeedEaterError::Database(e.to_string())
    }
}
