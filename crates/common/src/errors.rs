use std::io;
use thiserror::Error;

/// Failure taxonomy shared by the frame, control and capture crates.
#[derive(Error, Debug)]
pub enum UvcError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Out of memory: could not provide {requested} bytes")]
    NoMemory { requested: usize },

    #[error("Access denied")]
    AccessDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Device busy")]
    Busy,

    #[error("No sink attached")]
    NoSink,

    #[error("Already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, UvcError>;

impl UvcError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        UvcError::InvalidParameter(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        UvcError::NotSupported(msg.into())
    }
}
