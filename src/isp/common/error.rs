use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IspError {
    #[error("Invalid usage: {0}")]
    Usage(String),

    #[error("Referenced file not found: {0}")]
    ResourceNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized input format: {0}")]
    Format(String),

    #[error("Failed to decode input: {0}")]
    Decode(String),

    #[error("Failed to encode output: {0}")]
    Encode(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IspError>;
