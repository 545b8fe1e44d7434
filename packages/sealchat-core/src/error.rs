//! # Error Handling
//!
//! Error types for SealChat Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Input Errors                                                      │
//! │  │   └── InvalidInput           - Bad key length/encoding, empty pw   │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── AuthenticationFailure - Tag mismatch or verifier mismatch    │
//! │  │   ├── RandomnessUnavailable - OS CSPRNG could not supply bytes     │
//! │  │   └── KeyDerivationFailed   - KDF parameters rejected              │
//! │  │                                                                      │
//! │  ├── Account Errors                                                    │
//! │  │   ├── UserExists            - Username already registered          │
//! │  │   └── UserNotFound          - No such user                         │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── DatabaseError         - SQLite failure                       │
//! │  │   └── StorageCorrupted      - Stored record is malformed           │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── SerializationError                                            │
//! │      └── Internal                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `AuthenticationFailure` is deliberately opaque: it never says whether the
//! username was unknown, the password was wrong or the ciphertext was
//! tampered with.

use thiserror::Error;

/// Result type alias for SealChat Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SealChat Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input Errors (100-199)
    // ========================================================================

    /// Malformed input rejected before any cryptographic call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================

    /// AEAD tag mismatch, wrong password, or verifier mismatch
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// The secure random source could not supply bytes
    #[error("Secure randomness unavailable")]
    RandomnessUnavailable,

    /// Key derivation could not run with the given parameters
    #[error("Failed to derive keys: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Account Errors (600-699)
    // ========================================================================

    /// Username is already registered
    #[error("User already exists")]
    UserExists,

    /// No user with the given name or id
    #[error("User not found")]
    UserNotFound,

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable numeric code, grouped by category:
    /// - 100-199: Input
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 600-699: Accounts
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) => 100,

            Error::AuthenticationFailure => 300,
            Error::RandomnessUnavailable => 301,
            Error::KeyDerivationFailed(_) => 302,

            Error::DatabaseError(_) => 400,
            Error::StorageCorrupted(_) => 401,

            Error::UserExists => 600,
            Error::UserNotFound => 601,

            Error::SerializationError(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Whether the caller can fix this by changing what it sent
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::AuthenticationFailure | Error::UserExists
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidInput(format!("bad base64: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::InvalidInput("x".into()).code(), 100);
        assert_eq!(Error::AuthenticationFailure.code(), 300);
        assert_eq!(Error::RandomnessUnavailable.code(), 301);
        assert_eq!(Error::DatabaseError("x".into()).code(), 400);
        assert_eq!(Error::UserExists.code(), 600);
        assert_eq!(Error::Internal("x".into()).code(), 901);
    }

    #[test]
    fn test_authentication_failure_is_opaque() {
        assert_eq!(Error::AuthenticationFailure.to_string(), "Authentication failed");
    }

    #[test]
    fn test_base64_error_is_invalid_input() {
        use base64::Engine;
        let err: Error = base64::engine::general_purpose::STANDARD
            .decode("not base64!!")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), 100);
        assert!(err.requires_user_action());
    }
}
