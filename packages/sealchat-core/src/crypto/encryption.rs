//! # AEAD Cipher
//!
//! AES-256-GCM is the single symmetric primitive in SealChat. It protects
//! two things:
//!
//! - the user's X25519 private key, sealed under the password-derived
//!   wrap key (see [`super::keys`])
//! - message payloads, sealed under the ECDH session key (see
//!   [`super::codec`])
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              seal / open                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  seal(key, plaintext, aad)                                             │
//! │     1. nonce ← 12 bytes from the OS CSPRNG (fresh on every call)       │
//! │     2. ct    ← AES-256-GCM(key, nonce, plaintext, aad)                 │
//! │     → (nonce, ct || 16-byte tag)                                       │
//! │                                                                         │
//! │  open(key, nonce, ct, aad)                                             │
//! │     → plaintext, or AuthenticationFailure on any tag mismatch         │
//! │       (no partial plaintext is ever returned)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Nonce Budget
//!
//! Random 96-bit nonces are safe for roughly 2^32 encryptions under one
//! key. Session keys are static per pair of users, so this bounds the
//! lifetime message count of a single conversation.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::fill_random;
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// **NEVER reuse a nonce with the same key.** Reuse leaks the XOR of the
/// two plaintexts and lets an attacker forge tags. Nonces are only ever
/// produced by [`Nonce::random`] when sealing; the other constructors exist
/// for decoding stored or transmitted nonces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; NONCE_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decode a nonce of unknown length (storage, wire)
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM key
///
/// Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes
    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        // A 32-byte array always satisfies the AES-256 key size.
        Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Seal `plaintext` under `key`, authenticating `aad` alongside it
///
/// Returns the fresh nonce and the ciphertext with the 16-byte tag
/// appended (`ciphertext.len() == plaintext.len() + TAG_SIZE`).
pub fn seal(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random()?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = key
        .cipher()
        .encrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| Error::Internal("AES-GCM encryption failed".into()))?;

    Ok((nonce, ciphertext))
}

/// Open a sealed payload
///
/// ## Errors
///
/// Returns `AuthenticationFailure` if:
/// - The ciphertext or nonce was tampered with
/// - The AAD doesn't match
/// - The key is wrong
/// - The ciphertext is too short to even hold a tag
pub fn open(key: &EncryptionKey, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::AuthenticationFailure);
    }

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    key.cipher()
        .decrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| Error::AuthenticationFailure)
}

// ============================================================================
// TESTS
// ============================================================================
