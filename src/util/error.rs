//! Error types for the imdl codec.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for imdl operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Container magic matched but the header is inconsistent
    #[error("Malformed container header: {0}")]
    MalformedHeader(String),

    /// A declared length or buffer count exceeds the configured limit
    #[error("Quota exceeded: {what} is {requested}, limit is {limit}")]
    QuotaExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// Fewer bytes available than a chunk or view declares
    #[error("Truncated chunk '{name}': expected {expected} bytes, got {available}")]
    TruncatedChunk {
        name: String,
        expected: u64,
        available: u64,
    },

    /// A buffer view or buffer name that is not in the table
    #[error("Invalid buffer reference: {0}")]
    InvalidBufferReference(String),

    /// External buffer URI is empty, absolute or escapes its directory
    #[error("Invalid resource URI: '{0}'")]
    InvalidResourceUri(String),

    /// Surface type tag with no registered vertex layout
    #[error("Unsupported surface type: {0}")]
    UnsupportedSurfaceType(u32),

    /// Index does not fit the 24-bit index encoding
    #[error("Vertex index {index} at position {position} does not fit in 24 bits")]
    IndexOutOfRange { index: u32, position: usize },

    /// Packed index buffer length is not a multiple of 3
    #[error("Index buffer length {0} is not a multiple of 3")]
    MalformedIndices(usize),

    /// JSON description is structurally valid but semantically wrong
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Pixel codec missing or failed
    #[error("Texture codec error: {0}")]
    TextureCodec(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed header error.
    pub fn header(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }

    /// Create an invalid document error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Create a truncated chunk error.
    pub fn truncated(name: impl Into<String>, expected: u64, available: u64) -> Self {
        Self::TruncatedChunk {
            name: name.into(),
            expected,
            available,
        }
    }
}

/// Result type alias for imdl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::header("json chunk longer than container");
        assert!(e.to_string().contains("json chunk"));

        let e = Error::QuotaExceeded { what: "external buffers", requested: 12, limit: 10 };
        assert!(e.to_string().contains("12"));
        assert!(e.to_string().contains("10"));

        let e = Error::truncated("BIN", 64, 10);
        assert!(e.to_string().contains("BIN"));
        assert!(e.to_string().contains("64"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
