use std::io;
use thiserror::Error;

/// The primary error type for the `qcdm-lib` library.
#[derive(Error, Debug)]
pub enum DiagError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown log packet type name: {0:?}")]
    UnknownTypeName(String),

    #[error("Log config message failed to encode: {0}")]
    Encode(String),

    #[error("Failed to send message: {0}")]
    Send(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Failed to decode payload of type {type_id:#06x}: {message}")]
    Decode { type_id: u16, message: String },
}
