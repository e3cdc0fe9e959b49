//! Error types for the key provider

use thiserror::Error;

/// Result type for key provider operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised while generating, importing or using key material
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key generation failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Exported key material could not be encoded
    #[error("Key export failed: {0}")]
    KeyExport(String),

    /// Key material could not be parsed
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// Input was not valid base64
    #[error("Invalid base64 input: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, corrupt or truncated ciphertext)
    #[error("Decryption failed: {0}")]
    Decryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::Decryption("padding".to_string());
        assert_eq!(err.to_string(), "Decryption failed: padding");
    }

    #[test]
    fn test_base64_conversion() {
        use base64::Engine as _;
        let decode_err = base64::engine::general_purpose::STANDARD
            .decode("not base64!")
            .unwrap_err();
        let err: CryptoError = decode_err.into();
        assert!(matches!(err, CryptoError::InvalidEncoding(_)));
    }
}
