use thiserror::Error;

#[derive(Error, Debug)]
pub enum AskError {
    /// The inference engine produced no output (unavailable, timed out, shut down).
    #[error("Generation error: {0}")]
    Generation(String),

    /// The generated text was rejected before it could reach the database.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AskError {
    /// Short machine-friendly name of the failure class, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AskError::Generation(_) => "generation_failure",
            AskError::Validation(_) => "validation_error",
            AskError::Config(_) => "config_error",
            AskError::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, AskError>;
