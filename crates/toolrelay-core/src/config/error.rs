//! Configuration errors

/// Errors that can occur while loading or writing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
