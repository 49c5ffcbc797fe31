use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum EcgError {
    #[error("Filter design failed: {0}")]
    FilterDesign(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported recording: {0}")]
    Recording(String),

    #[error("Insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, EcgError>;
