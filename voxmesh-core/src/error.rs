//! Error types for voxmesh

use thiserror::Error;

/// Main error type for voxmesh operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("No surface found at isolevel {isolevel}")]
    NoSurface { isolevel: f32 },

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::Allocation(e.to_string())
    }
}

/// Result type alias for voxmesh operations
pub type Result<T> = std::result::Result<T, Error>;
