//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to process exit codes returned by the `vault` binary:
/// - [`ServiceError::BadRequest`] → 2
/// - [`ServiceError::EncryptionFailure`] / [`ServiceError::DecryptionFailure`] → 3
/// - [`ServiceError::Timeout`] → 4
/// - [`ServiceError::Internal`] → 1
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The input was rejected before reaching a primitive: empty text, text
    /// over the configured limit, or an unknown scheme.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The plaintext could not be encrypted (e.g. a code point outside the
    /// RSA modulus range).
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The envelope could not be decoded or decrypted.
    #[error("decryption failure: {0}")]
    DecryptionFailure(String),

    /// The operation exceeded the configured wall-clock limit.
    #[error("operation timed out after {0}s")]
    Timeout(u64),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ServiceError::BadRequest(_) => 2,
            ServiceError::EncryptionFailure(_) => 3,
            ServiceError::DecryptionFailure(_) => 3,
            ServiceError::Timeout(_) => 4,
            ServiceError::Internal(_) => 1,
        }
    }

    /// Short machine-readable code used in JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::DecryptionFailure(_) => "decryption_failure",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
