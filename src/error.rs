//! Error types for the streaming gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Error types that can occur while serving a file route
#[derive(Error, Debug, Clone)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid secure hash for requested file")]
    InvalidHash,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Transfer failed for chunk {chunk_index}: {message}")]
    TransferError { chunk_index: u64, message: String },

    #[error("Malformed range header: {0}")]
    MalformedRange(String),

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    #[error("Invalid route id: {0}")]
    InvalidRoute(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::IoError(err.to_string())
    }
}

impl GateError {
    /// Convert error to the HTTP status code returned to the client
    ///
    /// - `InvalidHash` and `InvalidRoute` fail closed with 403
    /// - `FileNotFound` maps to 404
    /// - everything else is a 500; a `TransferError` raised after headers
    ///   have been flushed instead terminates the body mid-stream
    pub fn to_http_status(&self) -> u16 {
        match self {
            GateError::InvalidHash => 403,
            GateError::InvalidRoute(_) => 403,
            GateError::FileNotFound(_) => 404,
            GateError::TransferError { .. } => 500,
            // Malformed ranges fall back to whole-file semantics before
            // ever reaching the response path; mapped anyway.
            GateError::MalformedRange(_) => 400,
            GateError::InvalidRange(_) => 416,
            GateError::ConfigError(_) => 500,
            GateError::IoError(_) => 500,
            GateError::InternalError(_) => 500,
        }
    }

    /// Whether the error text may be echoed in the response body
    ///
    /// 403 responses leak nothing about the target file; 5xx bodies carry
    /// the message for operator debuggability.
    pub fn expose_message(&self) -> bool {
        !matches!(self, GateError::InvalidHash | GateError::InvalidRoute(_))
    }

    /// Create a transfer error for a failed chunk fetch
    pub fn transfer(chunk_index: u64, message: impl Into<String>) -> Self {
        GateError::TransferError {
            chunk_index,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GateError::InvalidHash.to_http_status(), 403);
        assert_eq!(GateError::FileNotFound("gone".into()).to_http_status(), 404);
        assert_eq!(GateError::transfer(3, "reset").to_http_status(), 500);
        assert_eq!(GateError::InvalidRange("bad".into()).to_http_status(), 416);
    }

    #[test]
    fn test_hash_errors_leak_nothing() {
        assert!(!GateError::InvalidHash.expose_message());
        assert!(!GateError::InvalidRoute("x".into()).expose_message());
        assert!(GateError::InternalError("boom".into()).expose_message());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: GateError = io.into();
        assert!(matches!(err, GateError::IoError(_)));
    }
}
