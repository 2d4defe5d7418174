//! Error types for the Gaia client
//!
//! Provides a unified error type for all Gaia operations.

use thiserror::Error;

/// Result type alias for Gaia operations
pub type Result<T> = std::result::Result<T, GaiaError>;

/// Unified error type for the Gaia client
#[derive(Error, Debug)]
pub enum GaiaError {
    // ===== Encoding Errors =====
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    // ===== Cryptography Errors =====
    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Signature verification failed for {0}")]
    SignatureVerification(String),

    // ===== Hub Protocol Errors =====
    #[error("Unsupported hub version: {0}")]
    UnsupportedHubVersion(String),

    #[error("Upload failed ({status}): {message}")]
    Upload { status: u16, message: String },

    #[error("Download failed ({status}): {message}")]
    Download { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Listing error: {0}")]
    Listing(String),

    #[error("Batch error: {0}")]
    Batch(String),

    // ===== Session Errors =====
    #[error("Session error: {0}")]
    Session(String),

    // ===== Network Errors =====
    #[error("Network error: {0}")]
    Network(String),

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for GaiaError {
    fn from(err: serde_json::Error) -> Self {
        GaiaError::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for GaiaError {
    fn from(err: hex::FromHexError) -> Self {
        GaiaError::InvalidEncoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GaiaError::Upload {
            status: 503,
            message: "hub unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Upload failed (503): hub unavailable");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GaiaError = io_err.into();
        assert!(matches!(err, GaiaError::Io(_)));
    }

    #[test]
    fn test_error_from_hex() {
        let err: GaiaError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, GaiaError::InvalidEncoding(_)));
    }
}
