//! Error types for volume loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a NIfTI volume
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Header is byte-swapped; only native endian NIfTI is supported")]
    ForeignEndian,

    #[error("Invalid NIfTI header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported NIfTI datatype code {code}")]
    UnsupportedDatatype { code: i16 },

    #[error("Image data truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VolumeError> for voxmesh_core::Error {
    fn from(err: VolumeError) -> Self {
        match err {
            VolumeError::Io(e) => voxmesh_core::Error::Io(e),
            VolumeError::UnsupportedDatatype { .. } => {
                voxmesh_core::Error::UnsupportedFormat(err.to_string())
            }
            other => voxmesh_core::Error::InvalidData(other.to_string()),
        }
    }
}
