use thiserror::Error;

/// Errors that can occur while starting or running the service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream client error: {0}")]
    Client(String),

    #[error("Rate limit store error: {0}")]
    Store(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
