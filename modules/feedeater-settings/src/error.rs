use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("missing required setting `{module}.{key}`")]
    MissingRequired { module: String, key: String },

    #[error("invalid value for setting `{module}.{key}`: {reason}")]
    InvalidValue { module: String, key: String, reason: String },
}
