use thiserror::Error;

use crate::driver::DriverError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Source unavailable: {source_name}: {message}")]
    SourceUnavailable { source_name: String, message: String },

    #[error("Unresolved placeholder {{{placeholder}}} in template for {site}")]
    UnresolvedPlaceholder { site: String, placeholder: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
