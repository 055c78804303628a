//! Error types for the fluid cache library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or creating a cache file failed
    #[error("Failed to open {path}: {reason}")]
    OpenFailure { path: PathBuf, reason: String },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Channel, layer or node not found by name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Layer exists but its encoding is outside the supported set
    #[error("Unsupported field type for '{0}'")]
    TypeUnsupported(String),

    /// A write was requested with an absent source array
    #[error("Source array is missing for channel '{0}'")]
    NullData(String),

    /// A layer matched a value type but none of the known field classes
    #[error("Dynamic downcast failed for '{name}': class {class_name} is not {expected}")]
    DowncastFailure {
        name: String,
        class_name: String,
        expected: String,
    },

    /// Source array is shorter than the resolution requires
    #[error("Array for '{channel}' too short: need {expected} values, got {actual}")]
    ArrayTooShort {
        channel: String,
        expected: usize,
        actual: usize,
    },

    /// Voxel index outside the destination array during a read scatter
    #[error("Index {index} out of bounds for '{channel}' (length: {len})")]
    IndexOutOfBounds {
        channel: String,
        index: usize,
        len: usize,
    },

    /// Staggered component sizes stored in a layer disagree with its resolution
    #[error("MAC layout mismatch for '{channel}': stored {stored:?}, expected {expected:?}")]
    MacLayoutMismatch {
        channel: String,
        stored: [usize; 3],
        expected: [usize; 3],
    },

    /// Invalid magic bytes at start of file
    #[error("Invalid cache file: expected field container magic bytes")]
    InvalidMagic,

    /// Unsupported container version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    /// File is truncated or corrupted
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Operation requires an open session or store handle
    #[error("No file is open")]
    NotOpen,

    /// Write operation on a handle opened for reading only
    #[error("Cache is opened read-only")]
    ReadOnly,

    /// Read operation on a handle opened for writing only
    #[error("Cache is opened write-only")]
    WriteOnly,

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an open failure for `path`.
    pub fn open_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OpenFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::ArrayTooShort {
            channel: "density".into(),
            expected: 8,
            actual: 3,
        };
        assert!(e.to_string().contains("density"));
        assert!(e.to_string().contains('8'));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_open_failure_names_path() {
        let e = Error::open_failure("/tmp/fluidFrame1.f3d", "bad mode");
        let msg = e.to_string();
        assert!(msg.contains("fluidFrame1.f3d"));
        assert!(msg.contains("bad mode"));
    }
}
