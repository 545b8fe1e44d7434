//! # Cryptography Module
//!
//! All cryptographic primitives used by SealChat Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY CUSTODY                                  │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Password + Salt ──Argon2id──► Password Key                     │   │
//! │  │                                     │                           │   │
//! │  │                    ┌────────────────┴───────────────┐          │   │
//! │  │                    ▼                                ▼          │   │
//! │  │             WrapKey (HKDF)                AuthVerifier (HKDF)  │   │
//! │  │                    │                                │          │   │
//! │  │                    ▼                                ▼          │   │
//! │  │    AES-256-GCM(X25519 private key)        stored for login     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 MESSAGE ENCRYPTION                              │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Key Exchange: X25519 ECDH                                  │   │
//! │  │     Alice's Private × Bob's Public = Shared Secret            │   │
//! │  │                                                                 │   │
//! │  │  2. Key Derivation: HKDF-SHA256, no salt                       │   │
//! │  │     Shared Secret → Session Key                               │   │
//! │  │                                                                 │   │
//! │  │  3. Encryption: AES-256-GCM                                    │   │
//! │  │     • 256-bit key                                              │   │
//! │  │     • 96-bit nonce (random per message)                        │   │
//! │  │     • 128-bit authentication tag                               │   │
//! │  │     • optional AAD binding sender and receiver ids             │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | Argon2id | Password key derivation |
//! | HKDF-SHA256 | Domain separation |
//! | X25519 | Key agreement |
//! | AES-256-GCM | Key wrapping and message encryption |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Constant-Time Comparison**: Verifiers are compared with `subtle`
//! 3. **Secure Random**: `OsRng` only; failure surfaces as `RandomnessUnavailable`
//! 4. **No Nonce Reuse**: A fresh random nonce for every seal

mod agreement;
mod codec;
mod encryption;
mod kdf;
mod keys;
mod verifier;

pub use agreement::{agree, SessionKey};
pub use codec::{decrypt, decrypt_bound, encrypt, encrypt_bound, MessageContext, SealedMessage};
pub use encryption::{open, seal, EncryptionKey, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::{
    derive_password_key, derive_password_secrets, domain, generate_salt, AuthVerifier, KdfParams,
    PasswordKey, PasswordSecrets, Salt, WrapKey, SALT_SIZE,
};
pub use keys::{
    unwrap_private_key, wrap_private_key, KeyPair, PrivateKey, PublicKey, WrappedPrivateKey,
    KEY_LEN, WRAPPED_KEY_LEN,
};
pub use verifier::verify;

#[cfg(test)]
pub(crate) use kdf::tests::test_params;

use rand::rngs::OsRng;
use rand_core::RngCore;

use crate::error::{Error, Result};

/// Fill `buf` from the OS CSPRNG
///
/// Never falls back to a weaker source.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        tracing::error!("OS randomness unavailable: {}", e);
        Error::RandomnessUnavailable
    })
}
