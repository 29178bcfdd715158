use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChaindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ChaindError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ChaindError::Config(_) => "CONFIG_ERROR",
            ChaindError::Logging(_) => "LOGGING_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChaindError>;
